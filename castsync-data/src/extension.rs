//! Choosing a file extension for an enclosure.
//!
//! Strategies run in a fixed order and the first one with an opinion wins:
//! the declared MIME type (curated table, then the general `mime_guess`
//! mapping), then the suffix of the URL path. Probing the server for a
//! `Content-Type` needs the network and is left to the caller, which should
//! feed the answer back through [`from_mime`] and finally fall back to
//! [`Extension::fallback`].

use crate::models::Enclosure;
use std::fmt;

/// Used when nothing else gives an answer.
pub const DEFAULT_EXTENSION: &str = "bin";

/// Suffixes longer than this are not treated as file extensions.
pub const MAX_EXTENSION_LEN: usize = 8;

const WAV_MIME_TYPES: [&str; 4] = ["audio/wav", "audio/x-wav", "audio/wave", "audio/vnd.wave"];

/// Types that say "some bytes" and nothing about the format.
const GENERIC_MIME_TYPES: [&str; 6] = [
    "application/octet-stream",
    "binary/octet-stream",
    "application/binary",
    "application/x-octet-stream",
    "application/download",
    "application/force-download",
];

/// `mime_guess` lists extensions alphabetically; these pick the usual one.
const PREFERRED: &[(&str, &str)] = &[
    ("text/html", "html"),
    ("text/plain", "txt"),
    ("text/xml", "xml"),
    ("application/xml", "xml"),
    ("application/json", "json"),
    ("application/pdf", "pdf"),
    ("application/zip", "zip"),
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("audio/midi", "mid"),
    ("audio/x-midi", "mid"),
    ("audio/basic", "au"),
];

const CURATED: &[(&str, &str)] = &[
    ("audio/mpeg", "mp3"),
    ("audio/mp3", "mp3"),
    ("audio/mpeg3", "mp3"),
    ("audio/x-mpeg", "mp3"),
    ("audio/x-mp3", "mp3"),
    ("audio/mpg", "mp3"),
    ("audio/mp4", "m4a"),
    ("audio/m4a", "m4a"),
    ("audio/x-m4a", "m4a"),
    ("audio/aac", "aac"),
    ("audio/aacp", "aac"),
    ("audio/x-aac", "aac"),
    ("audio/ogg", "ogg"),
    ("audio/vorbis", "ogg"),
    ("audio/x-vorbis+ogg", "ogg"),
    ("audio/opus", "opus"),
    ("audio/flac", "flac"),
    ("audio/x-flac", "flac"),
    ("audio/wav", "wav"),
    ("audio/x-wav", "wav"),
    ("audio/wave", "wav"),
    ("audio/vnd.wave", "wav"),
    ("audio/aiff", "aiff"),
    ("audio/x-aiff", "aiff"),
    ("audio/webm", "weba"),
    ("audio/x-ms-wma", "wma"),
    ("audio/x-matroska", "mka"),
    ("video/mp4", "mp4"),
    ("video/x-m4v", "m4v"),
    ("video/quicktime", "mov"),
    ("video/webm", "webm"),
    ("video/x-matroska", "mkv"),
    ("video/ogg", "ogv"),
];

/// A sanitized, lowercase, alphanumeric file extension without the dot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Extension(String);

impl Extension {
    /// Sanitize `raw` into an extension, or `None` when nothing usable is left.
    pub fn new(raw: &str) -> Option<Self> {
        let clean: String = raw
            .chars()
            .map(|c| c.to_ascii_lowercase())
            .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            .collect();
        if clean.is_empty() || clean.len() > MAX_EXTENSION_LEN {
            None
        } else {
            Some(Self(clean))
        }
    }
    /// The `bin` extension
    pub fn fallback() -> Self {
        Self(DEFAULT_EXTENSION.to_owned())
    }
    /// The extension as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which step of the chain produced an extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedBy {
    /// The declared MIME type was in the curated table
    CuratedMime,
    /// The declared MIME type was known to `mime_guess`
    GeneralMime,
    /// The suffix of the URL path
    UrlSuffix,
    /// The `Content-Type` reported by the server
    Probe,
    /// Nothing else worked
    Default,
}

/// The outcome of resolving an enclosure's extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// The extension to use for the local file
    pub extension: Extension,
    /// The normalized content type the extension came from, if any
    pub content_type: Option<String>,
    /// Which strategy answered
    pub resolved_by: ResolvedBy,
}

impl Resolved {
    /// Resolve using a `Content-Type` reported by the server.
    pub fn from_probe(content_type: &str) -> Option<Self> {
        let mime = usable_mime(content_type)?;
        let extension = from_mime(&mime)?;
        Some(Self {
            extension,
            content_type: Some(mime),
            resolved_by: ResolvedBy::Probe,
        })
    }

    /// The last resort: `bin`
    pub fn fallback() -> Self {
        Self {
            extension: Extension::fallback(),
            content_type: None,
            resolved_by: ResolvedBy::Default,
        }
    }

    /// WAV files carry no ID3 tag.
    pub fn is_wav(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|mime| WAV_MIME_TYPES.contains(&mime))
            || self.extension.as_str() == "wav"
    }
}

/// A strategy that needs nothing but the enclosure itself.
pub type Strategy = fn(&Enclosure) -> Option<Resolved>;

/// The offline strategies, in priority order.
pub const STRATEGIES: [Strategy; 3] = [by_curated_mime, by_general_mime, by_url_suffix];

/// Run the offline strategies in order, returning the first answer.
pub fn resolve_offline(enclosure: &Enclosure) -> Option<Resolved> {
    STRATEGIES.iter().find_map(|strategy| strategy(enclosure))
}

/// Strip parameters and lowercase a MIME type; `None` if it is blank.
pub fn normalize_mime(raw: &str) -> Option<String> {
    let mime = raw.split(';').next().unwrap_or_default().trim();
    if mime.is_empty() {
        None
    } else {
        Some(mime.to_ascii_lowercase())
    }
}

/// Normalize a MIME type, dropping the generic octet-stream family.
pub fn usable_mime(raw: &str) -> Option<String> {
    normalize_mime(raw).filter(|mime| !GENERIC_MIME_TYPES.contains(&mime.as_str()))
}

/// Look up a normalized MIME type in the curated audio/video table.
pub fn from_curated_mime(mime: &str) -> Option<Extension> {
    CURATED
        .iter()
        .find(|(known, _)| *known == mime)
        .and_then(|(_, ext)| Extension::new(ext))
}

/// Look up a normalized MIME type in the general `mime_guess` mapping.
///
/// Several extensions usually fit one type. A `url` whose suffix is one of
/// them wins, then the usual extension for the type, then the first listed.
pub fn from_general_mime(mime: &str, url: Option<&str>) -> Option<Extension> {
    if GENERIC_MIME_TYPES.contains(&mime) {
        return None;
    }
    let known = mime_guess::get_mime_extensions_str(mime)?;
    if let Some(suffix) = url.and_then(from_url) {
        if known.contains(&suffix.as_str()) {
            return Some(suffix);
        }
    }
    if let Some(ext) = PREFERRED
        .iter()
        .find(|(known_mime, _)| *known_mime == mime)
        .and_then(|(_, ext)| Extension::new(ext))
    {
        return Some(ext);
    }
    known.iter().find_map(|ext| Extension::new(ext))
}

/// Curated table first, then the general mapping.
pub fn from_mime(mime: &str) -> Option<Extension> {
    if GENERIC_MIME_TYPES.contains(&mime) {
        return None;
    }
    from_curated_mime(mime).or_else(|| from_general_mime(mime, None))
}

/// The suffix of the last path segment of `url`, ignoring query and fragment.
pub fn from_url(url: &str) -> Option<Extension> {
    let path = match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_owned(),
        // Relative or otherwise odd URLs: cut query and fragment by hand.
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_owned(),
    };
    let segment = path.rsplit('/').next()?;
    let (_, suffix) = segment.rsplit_once('.')?;
    Extension::new(suffix)
}

fn by_curated_mime(enclosure: &Enclosure) -> Option<Resolved> {
    let mime = usable_mime(enclosure.mime_type()?)?;
    let extension = from_curated_mime(&mime)?;
    Some(Resolved {
        extension,
        content_type: Some(mime),
        resolved_by: ResolvedBy::CuratedMime,
    })
}

fn by_general_mime(enclosure: &Enclosure) -> Option<Resolved> {
    let mime = usable_mime(enclosure.mime_type()?)?;
    let extension = from_general_mime(&mime, Some(enclosure.url()))?;
    Some(Resolved {
        extension,
        content_type: Some(mime),
        resolved_by: ResolvedBy::GeneralMime,
    })
}

fn by_url_suffix(enclosure: &Enclosure) -> Option<Resolved> {
    Some(Resolved {
        extension: from_url(enclosure.url())?,
        content_type: None,
        resolved_by: ResolvedBy::UrlSuffix,
    })
}
