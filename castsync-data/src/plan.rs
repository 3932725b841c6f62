use crate::models::FeedEntry;
use crate::watermark::Watermark;

/// An entry that has to be processed in this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedEntry<'a> {
    /// The entry itself
    pub entry: &'a FeedEntry,
    /// The 1-based track number shared by all enclosures of the entry
    pub track: u32,
}

/// The entries of a run, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPlan<'a> {
    watermark: Watermark,
    considered: usize,
    pending: Vec<PlannedEntry<'a>>,
}

impl<'a> SyncPlan<'a> {
    /// The watermark the plan was made against
    pub fn watermark(&self) -> Watermark {
        self.watermark
    }
    /// How many entries the feed held
    pub fn considered(&self) -> usize {
        self.considered
    }
    /// The entries newer than the watermark, oldest first
    pub fn pending(&self) -> &[PlannedEntry<'a>] {
        &self.pending
    }
    /// Whether any entry needs work
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Decide which entries are new and number them.
///
/// Feeds list their newest item first, so the document order is reversed and
/// then stably sorted by publish time. Every entry of the feed gets a track
/// number from that ordering, including the ones the watermark filters out,
/// so numbering carries on across runs. Only entries published strictly after
/// `watermark` are pending.
pub fn plan(entries: &[FeedEntry], watermark: Watermark) -> SyncPlan<'_> {
    let mut ordered: Vec<&FeedEntry> = entries.iter().rev().collect();
    ordered.sort_by_key(|entry| entry.published());

    let pending = (1..)
        .zip(ordered)
        .filter(|(_, entry)| watermark.admits(entry.published()))
        .map(|(track, entry)| PlannedEntry { entry, track })
        .collect();

    SyncPlan {
        watermark,
        considered: entries.len(),
        pending,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn entry(title: &str, day: u32) -> FeedEntry {
        FeedEntry::new(title, Utc.with_ymd_and_hms(2023, 1, day, 0, 0, 0).unwrap())
    }

    fn titles_and_tracks(plan: &SyncPlan<'_>) -> Vec<(String, u32)> {
        plan.pending()
            .iter()
            .map(|p| (p.entry.title().to_owned(), p.track))
            .collect()
    }

    #[test]
    fn everything_is_new_on_first_run() {
        let feed = [entry("c", 5), entry("b", 3), entry("a", 1)];
        let plan = plan(&feed, Watermark::EPOCH);
        assert_eq!(
            titles_and_tracks(&plan),
            [("a".to_owned(), 1), ("b".to_owned(), 2), ("c".to_owned(), 3)]
        );
        assert_eq!(plan.considered(), 3);
    }

    #[test]
    fn watermark_filters_but_keeps_numbering() {
        let feed = [entry("c", 5), entry("b", 3), entry("a", 1)];
        let mark = Watermark::new(feed[1].published());
        let plan = plan(&feed, mark);
        assert_eq!(titles_and_tracks(&plan), [("c".to_owned(), 3)]);
        assert_eq!(plan.watermark(), mark);
    }

    #[test]
    fn unordered_feeds_are_sorted() {
        let feed = [entry("b", 3), entry("c", 5), entry("a", 1)];
        let plan = plan(&feed, Watermark::EPOCH);
        assert_eq!(
            titles_and_tracks(&plan),
            [("a".to_owned(), 1), ("b".to_owned(), 2), ("c".to_owned(), 3)]
        );
    }

    #[test]
    fn same_time_entries_keep_reversed_document_order() {
        let feed = [entry("listed first", 1), entry("listed second", 1)];
        let plan = plan(&feed, Watermark::EPOCH);
        assert_eq!(
            titles_and_tracks(&plan),
            [("listed second".to_owned(), 1), ("listed first".to_owned(), 2)]
        );
    }

    #[test]
    fn nothing_new() {
        let feed = [entry("a", 1)];
        assert!(plan(&feed, Watermark::new(feed[0].published())).is_empty());
    }
}
