use crate::extension::Extension;
use crate::models::FeedEntry;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

/// The longest file stem, before the extension is appended.
pub const MAX_STEM_LEN: usize = 100;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static UNSAFE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z0-9_]").unwrap());

/// Make `raw` safe for use as a file name.
///
/// Whitespace runs become a single `_`, everything outside `[A-Za-z0-9_]` is
/// dropped, and the result is lowercased.
pub fn sanitize(raw: &str) -> String {
    let underscored = WHITESPACE.replace_all(raw, "_");
    UNSAFE.replace_all(&underscored, "").to_lowercase()
}

/// The file stem for an entry: `yyyymmdd_title`, sanitized and bounded.
pub fn file_stem(published: DateTime<Utc>, title: &str) -> String {
    let mut stem = sanitize(&format!("{}_{}", published.format("%Y%m%d"), title));
    // Only ASCII survives sanitizing, so this cannot split a character.
    stem.truncate(MAX_STEM_LEN);
    stem
}

/// Where one enclosure of an entry is stored, and the track it becomes.
///
/// The first enclosure of an entry is named after the entry alone. Later
/// enclosures get their 1-based position appended to the stem (`_2`, `_3`, ..)
/// so two payloads of one entry never share a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    path: PathBuf,
    extension: Extension,
    track: u32,
}

impl DownloadTarget {
    /// Derive the target for the enclosure at `index` of an entry under `prefix`.
    pub fn derive(
        prefix: &Path,
        entry: &FeedEntry,
        index: usize,
        extension: Extension,
        track: u32,
    ) -> Self {
        let mut stem = file_stem(entry.published(), entry.title());
        if index > 0 {
            let suffix = format!("_{}", index + 1);
            stem.truncate(MAX_STEM_LEN - suffix.len());
            stem.push_str(&suffix);
        }
        let file_name = format!("{stem}.{extension}");
        Self {
            path: prefix.join(file_name),
            extension,
            track,
        }
    }
    /// The local path of the download
    pub fn path(&self) -> &Path {
        &self.path
    }
    /// The extension of the local file
    pub fn extension(&self) -> &Extension {
        &self.extension
    }
    /// The 1-based track number
    pub fn track(&self) -> u32 {
        self.track
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn jan(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, day, 23, 59, 0).unwrap()
    }

    #[rstest]
    #[case("Hello World", "hello_world")]
    #[case("  Tabs\tand\n\nnewlines ", "_tabs_and_newlines_")]
    #[case("Ep. #12: What's next?", "ep_12_whats_next")]
    #[case("Café – Ünïcode", "caf__ncode")]
    #[case("already_safe_123", "already_safe_123")]
    fn sanitize_cases(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(sanitize(raw), expected);
    }

    #[test]
    fn stem_is_deterministic() {
        let first = file_stem(jan(1), "Episode One: The Start");
        assert_eq!(first, "20230101_episode_one_the_start");
        assert_eq!(first, file_stem(jan(1), "Episode One: The Start"));
    }

    #[test]
    fn long_stems_are_truncated_before_the_extension() {
        let title = "word ".repeat(40);
        let entry = FeedEntry::new(title, jan(3));
        let target = DownloadTarget::derive(
            Path::new("/music/show"),
            &entry,
            0,
            Extension::new("mp3").unwrap(),
            7,
        );
        let name = target.path().file_name().unwrap().to_str().unwrap();
        let (stem, ext) = name.rsplit_once('.').unwrap();
        assert_eq!(stem.len(), MAX_STEM_LEN);
        assert!(stem.starts_with("20230103_word_word"));
        assert_eq!(ext, "mp3");
        assert_eq!(target.path().parent(), Some(Path::new("/music/show")));
        assert_eq!(target.track(), 7);
    }

    #[test]
    fn later_enclosures_get_a_position_suffix() {
        let entry = FeedEntry::new("Double Feature", jan(2));
        let mp3 = || Extension::new("mp3").unwrap();
        let prefix = Path::new("/music/show");

        let first = DownloadTarget::derive(prefix, &entry, 0, mp3(), 4);
        let second = DownloadTarget::derive(prefix, &entry, 1, mp3(), 4);
        let third = DownloadTarget::derive(prefix, &entry, 2, mp3(), 4);
        assert_eq!(first.path(), prefix.join("20230102_double_feature.mp3"));
        assert_eq!(second.path(), prefix.join("20230102_double_feature_2.mp3"));
        assert_eq!(third.path(), prefix.join("20230102_double_feature_3.mp3"));
        assert_eq!(second.track(), first.track());

        // The suffix survives truncation.
        let long = FeedEntry::new("word ".repeat(40), jan(2));
        let target = DownloadTarget::derive(prefix, &long, 1, mp3(), 1);
        let name = target.path().file_name().unwrap().to_str().unwrap();
        let stem = name.strip_suffix(".mp3").unwrap();
        assert_eq!(stem.len(), MAX_STEM_LEN);
        assert!(stem.ends_with("_2"));
    }
}
