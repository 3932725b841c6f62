#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![deny(unused_results)]
#![deny(unreachable_pub)]
#![deny(missing_debug_implementations)]
#![deny(rust_2018_idioms)]
#![deny(bad_style)]
#![deny(unused)]
#![deny(clippy::pedantic)]

pub mod extension;
/// Feed entries and their enclosures, parsed from RSS or Atom
pub mod models;
/// Deterministic local file names
pub mod naming;
/// Which entries a run processes, and in what order
pub mod plan;
/// The last-seen timestamp that bounds each run
pub mod watermark;

pub use extension::{Extension, Resolved, ResolvedBy};
pub use models::{Enclosure, EntryError, Feed, FeedEntry, FeedError};
pub use naming::DownloadTarget;
pub use plan::{plan, PlannedEntry, SyncPlan};
pub use watermark::{Watermark, WatermarkStore, WatermarkTracker};
