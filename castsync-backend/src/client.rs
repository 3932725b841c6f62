use castsync_data::Feed;
use reqwest::header::CONTENT_TYPE;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::error::Result;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Everything castsync asks of the network.
#[derive(Debug, Clone)]
pub(crate) struct FeedClient {
    http: reqwest::Client,
}

impl FeedClient {
    pub(crate) fn new() -> Result<Self> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { http })
    }

    pub(crate) async fn fetch_feed(&self, url: &str) -> Result<Feed> {
        let feed = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(Feed::from_xml(&feed[..])?)
    }

    /// Ask the server what it would send for `url`, without downloading it.
    ///
    /// Any failure is "no answer".
    pub(crate) async fn probe_content_type(&self, url: &str) -> Option<String> {
        let response = match self.http.head(url).send().await.and_then(|r| r.error_for_status()) {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("HEAD {url} failed: {e}");
                return None;
            }
        };
        response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
    }

    /// Stream `url` into `path`.
    ///
    /// Bytes land in `<path>.part` first and are renamed into place once
    /// complete, so `path` only ever exists as a whole file.
    pub(crate) async fn download(&self, url: &str, path: &Path) -> Result<u64> {
        let part = part_path(path);
        match self.stream_to(url, &part).await {
            Ok(written) => {
                tokio::fs::rename(&part, path).await?;
                Ok(written)
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&part).await;
                Err(e)
            }
        }
    }

    async fn stream_to(&self, url: &str, part: &Path) -> Result<u64> {
        let mut response = self.http.get(url).send().await?.error_for_status()?;
        let mut file = tokio::fs::File::create(part).await?;
        let mut written = 0;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(written)
    }
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".part");
    name.into()
}
