use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
struct ConfigFile {
    feed: Config,
}

/// The `[feed]` table of the configuration file.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Config {
    #[serde(rename = "RSSURL")]
    pub(crate) rss_url: String,
    #[serde(rename = "DownloadPrefix")]
    pub(crate) download_prefix: PathBuf,
    #[serde(rename = "Album", default)]
    pub(crate) album: Option<String>,
    #[serde(rename = "Genre", default)]
    pub(crate) genre: Option<String>,
}

impl Config {
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    pub(crate) fn from_toml(raw: &str) -> Result<Self> {
        let config = toml::from_str::<ConfigFile>(raw)?.feed;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.rss_url)
            .map_err(|e| Error::Config(format!("RSSURL {:?} is not a valid URL: {e}", self.rss_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "RSSURL must be http or https, got {:?}",
                url.scheme()
            )));
        }
        if self.download_prefix.as_os_str().is_empty() {
            return Err(Error::Config("DownloadPrefix must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_feed_table() {
        let config = Config::from_toml(
            r#"
            [feed]
            RSSURL = "https://example.com/feed.xml"
            DownloadPrefix = "/srv/podcasts/show"
            Album = "The Show"
            "#,
        )
        .unwrap();
        assert_eq!(config.rss_url, "https://example.com/feed.xml");
        assert_eq!(config.download_prefix, PathBuf::from("/srv/podcasts/show"));
        assert_eq!(config.album.as_deref(), Some("The Show"));
        assert_eq!(config.genre, None);
    }

    #[test]
    fn reject_bad_url() {
        let err = Config::from_toml(
            r#"
            [feed]
            RSSURL = "ftp://example.com/feed.xml"
            DownloadPrefix = "out"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn reject_missing_keys() {
        let err = Config::from_toml("[feed]\nRSSURL = \"https://example.com\"\n").unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("config.toml")).unwrap_err();
        assert!(matches!(err, Error::ConfigRead { .. }));
    }
}
