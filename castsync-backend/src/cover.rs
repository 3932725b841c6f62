use bytes::Bytes;
use std::path::Path;

use crate::client::FeedClient;
use crate::error::Result;

/// The cached channel artwork, kept in the download prefix.
pub(crate) const COVER_FILE_NAME: &str = "cover.jpg";

#[derive(Debug, Clone)]
pub(crate) struct CoverArt {
    pub(crate) data: Bytes,
    pub(crate) mime_type: &'static str,
}

/// Read the cached cover, downloading it from `image_uri` first if needed.
///
/// `Ok(None)` means there is no artwork to embed.
pub(crate) async fn load_or_fetch(
    client: &FeedClient,
    prefix: &Path,
    image_uri: Option<&str>,
) -> Result<Option<CoverArt>> {
    let path = prefix.join(COVER_FILE_NAME);
    if !tokio::fs::try_exists(&path).await? {
        let Some(image_uri) = image_uri else {
            tracing::warn!("Feed has no artwork; downloads will carry no cover");
            return Ok(None);
        };
        println!("Download artist image");
        let size = client.download(image_uri, &path).await?;
        tracing::debug!("Cached {size} byte cover from {image_uri}");
    }

    let data = Bytes::from(tokio::fs::read(&path).await?);
    match sniff_image(&data) {
        Some(mime_type) => Ok(Some(CoverArt { data, mime_type })),
        None => {
            tracing::warn!("{} is not a recognised image; skipping cover", path.display());
            Ok(None)
        }
    }
}

fn sniff_image(data: &[u8]) -> Option<&'static str> {
    infer::get(data)
        .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
        .map(|kind| kind.mime_type())
}

#[cfg(test)]
mod test {
    use super::*;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[test]
    fn sniff_known_images() {
        assert_eq!(sniff_image(b"\xFF\xD8\xFF\xE0rest"), Some("image/jpeg"));
        assert_eq!(sniff_image(PNG), Some("image/png"));
        assert_eq!(sniff_image(b"RIFF\0\0\0\0WEBPVP8 "), Some("image/webp"));
        assert_eq!(sniff_image(b"<html>"), None);
        // Recognised, but not an image
        assert_eq!(sniff_image(b"%PDF-1.7\n"), None);
    }

    #[tokio::test]
    async fn cover_is_fetched_once() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/art")
            .with_body(PNG)
            .expect(1)
            .create_async()
            .await;
        let dir = tempfile::tempdir().unwrap();
        let client = FeedClient::new().unwrap();
        let uri = format!("{}/art", server.url());

        for _ in 0..2 {
            let cover = load_or_fetch(&client, dir.path(), Some(&uri))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(cover.mime_type, "image/png");
            assert_eq!(&cover.data[..], PNG);
        }
        mock.assert_async().await;
        assert!(dir.path().join(COVER_FILE_NAME).exists());
    }

    #[tokio::test]
    async fn no_artwork_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let client = FeedClient::new().unwrap();
        assert!(load_or_fetch(&client, dir.path(), None).await.unwrap().is_none());
    }
}
