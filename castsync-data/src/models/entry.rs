use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;

static LINE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());

/// Reasons a feed item cannot become a [`FeedEntry`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EntryError {
    /// The item has no title, so no filename can be derived for it.
    #[error("no title specified for this entry")]
    MissingTitle,
    /// The item has no publish date, so it cannot be compared to the watermark.
    #[error("no publish date specified for entry {title:?}")]
    MissingPublished {
        /// Title of the offending entry
        title: String,
    },
    /// The item's publish date could not be parsed.
    #[error("invalid publish date {value:?} for entry {title:?}")]
    InvalidPublished {
        /// Title of the offending entry
        title: String,
        /// The date exactly as it appeared in the feed
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A downloadable attachment of a feed entry.
pub struct Enclosure {
    url: String,
    mime_type: Option<String>,
}

impl Enclosure {
    /// Create an enclosure. Blank MIME types are treated as missing.
    pub fn new(url: impl Into<String>, mime_type: Option<&str>) -> Self {
        let mime_type = mime_type
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned);
        Self {
            url: url.into().trim().to_owned(),
            mime_type,
        }
    }
    /// The URL of the payload
    pub fn url(&self) -> &str {
        &self.url
    }
    /// The MIME type declared by the feed, if any
    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// One item of a feed, normalised from either RSS or Atom.
pub struct FeedEntry {
    title: String,
    published: DateTime<Utc>,
    summary: Option<String>,
    enclosures: Vec<Enclosure>,
}

impl FeedEntry {
    /// Create an entry without summary or enclosures.
    pub fn new(title: impl Into<String>, published: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            published,
            summary: None,
            enclosures: Vec::new(),
        }
    }
    /// Attach a summary. HTML markup is stripped and blank summaries are dropped.
    #[must_use]
    pub fn with_summary(mut self, summary: &str) -> Self {
        self.summary = strip_html(summary);
        self
    }
    /// Append an enclosure
    #[must_use]
    pub fn with_enclosure(mut self, enclosure: Enclosure) -> Self {
        self.enclosures.push(enclosure);
        self
    }
    /// The title of this entry
    pub fn title(&self) -> &str {
        &self.title
    }
    /// When this entry was published, in UTC
    pub fn published(&self) -> DateTime<Utc> {
        self.published
    }
    /// The plain-text summary of this entry
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }
    /// The enclosures of this entry, in document order
    pub fn enclosures(&self) -> &[Enclosure] {
        &self.enclosures
    }
}

impl TryFrom<&rss::Item> for FeedEntry {
    type Error = EntryError;
    fn try_from(item: &rss::Item) -> Result<Self, Self::Error> {
        let title = item
            .title()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(EntryError::MissingTitle)?
            .to_owned();

        let raw_date = item
            .pub_date()
            .or_else(|| item.dublin_core_ext().and_then(|dc| dc.dates().first().map(String::as_str)))
            .ok_or_else(|| EntryError::MissingPublished {
                title: title.clone(),
            })?;
        let published = parse_date(raw_date).ok_or_else(|| EntryError::InvalidPublished {
            title: title.clone(),
            value: raw_date.to_owned(),
        })?;

        let mut entry = FeedEntry::new(title, published);
        // Prefer the plain description, fall back to the itunes summary.
        if let Some(summary) = item
            .description()
            .or_else(|| item.itunes_ext().and_then(|ext| ext.summary()))
        {
            entry = entry.with_summary(summary);
        }
        // http://www.rssboard.org/rss-specification#ltenclosuregtSubelementOfLtitemgt
        if let Some(enc) = item.enclosure().filter(|e| !e.url().trim().is_empty()) {
            entry = entry.with_enclosure(Enclosure::new(enc.url(), Some(enc.mime_type())));
        }
        Ok(entry)
    }
}

impl TryFrom<&atom_syndication::Entry> for FeedEntry {
    type Error = EntryError;
    fn try_from(item: &atom_syndication::Entry) -> Result<Self, Self::Error> {
        let title = item.title().value.trim().to_owned();
        if title.is_empty() {
            return Err(EntryError::MissingTitle);
        }

        // `updated` is mandatory in Atom, `published` is not.
        let published = item
            .published()
            .unwrap_or_else(|| item.updated())
            .with_timezone(&Utc);

        let mut entry = FeedEntry::new(title, published);
        if let Some(summary) = item.summary() {
            entry = entry.with_summary(&summary.value);
        }
        for link in item.links().iter().filter(|l| l.rel() == "enclosure") {
            entry = entry.with_enclosure(Enclosure::new(link.href(), link.mime_type()));
        }
        Ok(entry)
    }
}

/// Parse a feed date into UTC.
///
/// RSS mandates RFC 2822, but plenty of feeds emit RFC 3339 instead.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

fn strip_html(raw: &str) -> Option<String> {
    let raw = LINE_BREAK.replace_all(raw, "\n");
    let fragment = Html::parse_fragment(&raw);
    let text: String = fragment.root_element().text().collect();
    let text = text.replace('\u{a0}', " ");
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_owned())
    }
}
