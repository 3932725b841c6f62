use super::{EntryError, FeedEntry};

/// A document that could not be read as a feed.
#[derive(Debug, thiserror::Error)]
#[error("document is neither RSS ({rss}) nor Atom ({atom})")]
pub struct FeedError {
    rss: rss::Error,
    atom: atom_syndication::Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A parsed podcast feed.
pub struct Feed {
    title: String,
    image_uri: Option<String>,
    entries: Vec<FeedEntry>,
}

impl Feed {
    /// Parse a raw RSS 2.0 or Atom document.
    ///
    /// Items that cannot be converted into a [`FeedEntry`] are logged and
    /// skipped; only a document that is neither format is an error.
    pub fn from_xml(bytes: &[u8]) -> Result<Self, FeedError> {
        match rss::Channel::read_from(bytes) {
            Ok(channel) => Ok(Self::from(&channel)),
            Err(rss) => match atom_syndication::Feed::read_from(bytes) {
                Ok(feed) => Ok(Self::from(&feed)),
                Err(atom) => Err(FeedError { rss, atom }),
            },
        }
    }

    /// The channel title, used as the artist of every download
    pub fn title(&self) -> &str {
        &self.title
    }
    /// The URI of the channel artwork
    pub fn image_uri(&self) -> Option<&str> {
        self.image_uri.as_deref()
    }
    /// The entries in document order (usually newest first)
    pub fn entries(&self) -> &[FeedEntry] {
        &self.entries
    }
}

impl From<&rss::Channel> for Feed {
    fn from(channel: &rss::Channel) -> Self {
        let title = channel.title().trim().to_owned();
        let image = channel
            .itunes_ext()
            .and_then(|s| s.image().map(|url| url.trim()))
            .map(|s| s.to_owned());
        let image_uri = image.or_else(|| channel.image().map(|s| s.url().trim().to_owned()));
        let entries = collect_entries(channel.items().iter().map(FeedEntry::try_from));

        Feed {
            title,
            image_uri,
            entries,
        }
    }
}

impl From<&atom_syndication::Feed> for Feed {
    fn from(feed: &atom_syndication::Feed) -> Self {
        let title = feed.title().value.trim().to_owned();
        let image_uri = feed
            .logo()
            .or_else(|| feed.icon())
            .map(|s| s.trim().to_owned());
        let entries = collect_entries(feed.entries().iter().map(FeedEntry::try_from));

        Feed {
            title,
            image_uri,
            entries,
        }
    }
}

fn collect_entries(items: impl Iterator<Item = Result<FeedEntry, EntryError>>) -> Vec<FeedEntry> {
    items
        .filter_map(|item| match item {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Skipping feed item: {e}");
                None
            }
        })
        .collect()
}
