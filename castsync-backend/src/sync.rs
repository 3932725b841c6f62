use castsync_data::{
    extension, plan, DownloadTarget, Enclosure, Feed, PlannedEntry, Resolved, Watermark,
    WatermarkStore, WatermarkTracker,
};

use crate::client::FeedClient;
use crate::config::Config;
use crate::cover::{self, CoverArt};
use crate::error::Result;
use crate::tagger::{self, TrackTags};

/// What a finished run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SyncReport {
    /// Entries newer than the starting watermark
    pub(crate) pending: usize,
    pub(crate) downloaded: usize,
    pub(crate) already_present: usize,
    /// Dry-run only: enclosures that would have been downloaded
    pub(crate) would_download: usize,
    pub(crate) failed: usize,
    pub(crate) watermark: Watermark,
}

/// How one enclosure was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Downloaded,
    AlreadyPresent,
    WouldDownload,
}

/// One run of the pipeline: fetch, filter, download, tag, persist.
#[derive(Debug)]
pub(crate) struct Syncer<'a> {
    config: &'a Config,
    client: &'a FeedClient,
    dry_run: bool,
}

impl<'a> Syncer<'a> {
    pub(crate) fn new(config: &'a Config, client: &'a FeedClient, dry_run: bool) -> Self {
        Self {
            config,
            client,
            dry_run,
        }
    }

    pub(crate) async fn run(&self) -> Result<SyncReport> {
        // Nothing is written before the feed is in hand.
        let feed = self.client.fetch_feed(&self.config.rss_url).await?;
        let prefix = &self.config.download_prefix;
        let store = WatermarkStore::new(prefix);
        let plan = plan(feed.entries(), store.load());
        tracing::info!(
            "{}: {} of {} entries newer than {}",
            feed.title(),
            plan.pending().len(),
            plan.considered(),
            plan.watermark()
        );

        if !self.dry_run {
            tokio::fs::create_dir_all(prefix).await?;
        }

        let mut report = SyncReport {
            pending: plan.pending().len(),
            ..SyncReport::default()
        };
        let mut tracker = WatermarkTracker::new(plan.watermark());
        let mut cover: Option<Option<CoverArt>> = None;

        for item in plan.pending() {
            let mut entry_failed = false;
            for (index, enclosure) in item.entry.enclosures().iter().enumerate() {
                match self
                    .process_enclosure(&feed, item, index, enclosure, &mut cover)
                    .await
                {
                    Ok(Outcome::Downloaded) => report.downloaded += 1,
                    Ok(Outcome::AlreadyPresent) => report.already_present += 1,
                    Ok(Outcome::WouldDownload) => report.would_download += 1,
                    Err(e) => {
                        tracing::error!("Failed to fetch {}: {e}", enclosure.url());
                        report.failed += 1;
                        entry_failed = true;
                    }
                }
            }
            if entry_failed {
                tracker.record_failure();
            } else {
                tracker.record_success(item.entry.published());
            }
        }

        report.watermark = tracker.finish();
        if self.dry_run {
            tracing::info!("Dry run: watermark stays at {}", plan.watermark());
        } else {
            store.save(&report.watermark)?;
        }
        Ok(report)
    }

    async fn process_enclosure(
        &self,
        feed: &Feed,
        item: &PlannedEntry<'_>,
        index: usize,
        enclosure: &Enclosure,
        cover: &mut Option<Option<CoverArt>>,
    ) -> Result<Outcome> {
        let resolved = self.resolve_extension(enclosure).await;
        let target = DownloadTarget::derive(
            &self.config.download_prefix,
            item.entry,
            index,
            resolved.extension.clone(),
            item.track,
        );
        tracing::debug!(
            "{} -> {} ({:?}, track {})",
            enclosure.url(),
            target.path().display(),
            resolved.resolved_by,
            target.track()
        );

        if tokio::fs::try_exists(target.path()).await? {
            tracing::debug!("Already downloaded {}", target.path().display());
            return Ok(Outcome::AlreadyPresent);
        }
        if self.dry_run {
            println!(
                "Would download {} (track {})",
                target.path().display(),
                target.track()
            );
            return Ok(Outcome::WouldDownload);
        }

        println!("Downloading new item {}", target.path().display());
        let size = self.client.download(enclosure.url(), target.path()).await?;
        tracing::debug!("Wrote {size} bytes to {}", target.path().display());

        if resolved.is_wav() {
            tracing::debug!("Not tagging WAV file {}", target.path().display());
        } else {
            if cover.is_none() {
                *cover = Some(self.load_cover(feed).await);
            }
            let tags = TrackTags {
                artist: feed.title(),
                album: self.config.album.as_deref(),
                genre: self.config.genre.as_deref(),
                title: item.entry.title(),
                comment: item.entry.summary(),
                published: item.entry.published(),
                track: item.track,
            };
            // The audio is on disk either way; a bad tag is not worth a retry.
            if let Err(e) = tagger::write_tags(target.path(), &tags, cover.as_ref().and_then(Option::as_ref)) {
                tracing::warn!("Could not tag {}: {e}", target.path().display());
            }
        }
        if let Err(e) = tagger::set_file_times(target.path(), item.entry.published()) {
            tracing::warn!("Could not set times on {}: {e}", target.path().display());
        }
        Ok(Outcome::Downloaded)
    }

    /// Offline strategies first, then a HEAD request, then `bin`.
    async fn resolve_extension(&self, enclosure: &Enclosure) -> Resolved {
        if let Some(resolved) = extension::resolve_offline(enclosure) {
            return resolved;
        }
        self.client
            .probe_content_type(enclosure.url())
            .await
            .and_then(|content_type| Resolved::from_probe(&content_type))
            .unwrap_or_else(Resolved::fallback)
    }

    async fn load_cover(&self, feed: &Feed) -> Option<CoverArt> {
        match cover::load_or_fetch(self.client, &self.config.download_prefix, feed.image_uri()).await {
            Ok(cover) => cover,
            Err(e) => {
                tracing::warn!("Could not load cover art: {e}");
                None
            }
        }
    }
}
