use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use std::path::{Path, PathBuf};
use std::{fmt, fs, io};

/// The name of the state file kept in the download prefix.
pub const WATERMARK_FILE_NAME: &str = "last.txt";

/// The publish time of the newest entry that a previous run finished.
///
/// Entries published strictly after the watermark are new.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Watermark(DateTime<Utc>);

impl Watermark {
    /// The watermark of a feed that has never been synced
    pub const EPOCH: Watermark = Watermark(DateTime::<Utc>::UNIX_EPOCH);

    /// Wrap a timestamp
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(at)
    }
    /// The wrapped timestamp
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.0
    }
    /// Whether an entry published at `published` still has to be processed
    pub fn admits(&self, published: DateTime<Utc>) -> bool {
        published > self.0
    }

    /// Parse a persisted watermark.
    ///
    /// State files written by older versions carry no offset; those are UTC.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
            return Some(Self(at.with_timezone(&Utc)));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
            .map(|naive| Self(naive.and_utc()))
    }
}

impl Default for Watermark {
    fn default() -> Self {
        Self::EPOCH
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }
}

/// Reads and writes the watermark kept in `<prefix>/last.txt`.
#[derive(Debug, Clone)]
pub struct WatermarkStore {
    path: PathBuf,
}

impl WatermarkStore {
    /// A store for the download prefix `prefix`
    pub fn new(prefix: &Path) -> Self {
        Self {
            path: prefix.join(WATERMARK_FILE_NAME),
        }
    }

    /// The location of the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted watermark.
    ///
    /// A missing or unreadable state file means everything is new.
    pub fn load(&self) -> Watermark {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("No watermark at {}, starting from epoch", self.path.display());
                return Watermark::EPOCH;
            }
            Err(e) => {
                tracing::warn!("Cannot read {}: {e}; treating every entry as new", self.path.display());
                return Watermark::EPOCH;
            }
        };
        Watermark::parse(&raw).unwrap_or_else(|| {
            tracing::warn!(
                "Malformed watermark {:?} in {}; treating every entry as new",
                raw.trim(),
                self.path.display()
            );
            Watermark::EPOCH
        })
    }

    /// Persist `watermark`, replacing the previous value atomically.
    pub fn save(&self, watermark: &Watermark) -> io::Result<()> {
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, watermark.to_string())?;
        fs::rename(tmp_path, &self.path)?;
        Ok(())
    }
}

/// Tracks the high-water mark of a run as entries are processed oldest first.
///
/// Once an entry fails the mark stops advancing, so the failed entry is looked
/// at again on the next run.
#[derive(Debug, Clone)]
pub struct WatermarkTracker {
    current: Watermark,
    frozen: bool,
}

impl WatermarkTracker {
    /// Start tracking from the watermark read at the start of the run
    pub fn new(start: Watermark) -> Self {
        Self {
            current: start,
            frozen: false,
        }
    }
    /// An entry published at `published` was fully processed
    pub fn record_success(&mut self, published: DateTime<Utc>) {
        if !self.frozen && published > self.current.0 {
            self.current = Watermark(published);
        }
    }
    /// An entry could not be processed
    pub fn record_failure(&mut self) {
        self.frozen = true;
    }
    /// The watermark to persist
    pub fn finish(self) -> Watermark {
        self.current
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn missing_file_loads_epoch() {
        let dir = tempfile::tempdir().unwrap();
        let store = WatermarkStore::new(dir.path());
        assert_eq!(store.load(), Watermark::EPOCH);
        assert!(!store.path().exists());
    }

    #[test]
    fn malformed_file_loads_epoch() {
        let dir = tempfile::tempdir().unwrap();
        let store = WatermarkStore::new(dir.path());
        fs::write(store.path(), "not a date").unwrap();
        assert_eq!(store.load(), Watermark::EPOCH);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = WatermarkStore::new(dir.path());
        store.save(&Watermark::new(at(3))).unwrap();

        assert_eq!(fs::read_to_string(store.path()).unwrap(), "2023-01-03T00:00:00Z");
        assert_eq!(store.load(), Watermark::new(at(3)));
        assert!(!dir.path().join("last.tmp").exists());
    }

    #[test]
    fn naive_timestamps_are_utc() {
        assert_eq!(
            Watermark::parse("2023-01-03T00:00:00"),
            Some(Watermark::new(at(3)))
        );
        assert_eq!(
            Watermark::parse("2023-01-03T02:00:00+02:00\n"),
            Some(Watermark::new(at(3)))
        );
    }

    #[test]
    fn admits_strictly_newer() {
        let mark = Watermark::new(at(3));
        assert!(!mark.admits(at(1)));
        assert!(!mark.admits(at(3)));
        assert!(mark.admits(at(5)));
        assert!(Watermark::EPOCH.admits(at(1)));
    }

    #[test]
    fn tracker_is_monotonic() {
        let mut tracker = WatermarkTracker::new(Watermark::new(at(3)));
        tracker.record_success(at(1));
        assert_eq!(tracker.clone().finish(), Watermark::new(at(3)));
        tracker.record_success(at(5));
        assert_eq!(tracker.finish(), Watermark::new(at(5)));
    }

    #[test]
    fn tracker_stops_at_first_failure() {
        let mut tracker = WatermarkTracker::new(Watermark::EPOCH);
        tracker.record_success(at(1));
        tracker.record_failure();
        tracker.record_success(at(5));
        assert_eq!(tracker.finish(), Watermark::new(at(1)));
    }
}
