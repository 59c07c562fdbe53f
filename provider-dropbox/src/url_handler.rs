//! `dropbox://` song URLs
//!
//! Playlists keep Dropbox tracks as `dropbox://Music/song.mp3`. The path is
//! percent-encoded per segment and carries no leading slash; resolving it
//! back yields the absolute remote path `/Music/song.mp3`.

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::url_handler::{LoadResult, UrlHandler};
use std::sync::{Arc, Weak};
use tracing::debug;

use crate::config::encode_remote_path;
use crate::error::{DropboxError, Result};
use crate::service::DropboxService;

pub const DROPBOX_SCHEME: &str = "dropbox";

const SCHEME_PREFIX: &str = "dropbox://";

/// Song URL for the remote file at `path`.
pub fn song_url_for_path(path: &str) -> String {
    format!("{}{}", SCHEME_PREFIX, encode_remote_path(path))
}

/// Absolute remote path named by a `dropbox://` song URL.
pub fn remote_path_from_url(url: &str) -> Result<String> {
    let encoded = url
        .strip_prefix(SCHEME_PREFIX)
        .ok_or_else(|| DropboxError::InvalidSongUrl(url.to_string()))?
        .trim_start_matches('/');

    if encoded.is_empty() {
        return Err(DropboxError::InvalidSongUrl(url.to_string()));
    }

    let mut path = String::with_capacity(encoded.len() + 1);
    for segment in encoded.split('/') {
        let decoded = urlencoding::decode(segment)
            .map_err(|e| DropboxError::InvalidSongUrl(format!("{}: {}", url, e)))?;
        path.push('/');
        path.push_str(&decoded);
    }

    Ok(path)
}

/// Resolves `dropbox://` URLs for the player.
///
/// Holds the service weakly; once the service is dropped every load fails
/// with `NotAvailable`.
pub struct DropboxUrlHandler {
    service: Weak<DropboxService>,
}

impl DropboxUrlHandler {
    pub fn new(service: Weak<DropboxService>) -> Self {
        Self { service }
    }

    fn service(&self) -> BridgeResult<Arc<DropboxService>> {
        self.service
            .upgrade()
            .ok_or_else(|| BridgeError::NotAvailable("Dropbox service has shut down".to_string()))
    }

    /// Resolve `url`, blocking the calling thread until the API answers.
    pub fn start_loading_blocking(&self, url: &str) -> BridgeResult<LoadResult> {
        let media_url = self.service()?.resolve_streaming_url_blocking(url)?;
        Ok(LoadResult::TrackAvailable {
            original: url.to_string(),
            media_url,
        })
    }
}

#[async_trait]
impl UrlHandler for DropboxUrlHandler {
    fn scheme(&self) -> &str {
        DROPBOX_SCHEME
    }

    async fn start_loading(&self, url: &str) -> BridgeResult<LoadResult> {
        let service = self.service()?;
        let media_url = service.resolve_streaming_url(url).await?;

        debug!(url = %url, "Resolved song URL");
        Ok(LoadResult::TrackAvailable {
            original: url.to_string(),
            media_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_song_url_for_path() {
        assert_eq!(song_url_for_path("/b.mp3"), "dropbox://b.mp3");
        assert_eq!(
            song_url_for_path("/Music/Jazz & Blues/01 Track.ogg"),
            "dropbox://Music/Jazz%20%26%20Blues/01%20Track.ogg"
        );
    }

    #[test]
    fn test_remote_path_from_url() {
        assert_eq!(remote_path_from_url("dropbox://b.mp3").unwrap(), "/b.mp3");
        assert_eq!(
            remote_path_from_url("dropbox://Music/Jazz%20%26%20Blues/01%20Track.ogg").unwrap(),
            "/Music/Jazz & Blues/01 Track.ogg"
        );
        // Tolerate the absolute form too
        assert_eq!(remote_path_from_url("dropbox:///a/b.ogg").unwrap(), "/a/b.ogg");
    }

    #[test]
    fn test_remote_path_round_trips_song_url() {
        let path = "/Música/ß/track #1.mp3";
        assert_eq!(remote_path_from_url(&song_url_for_path(path)).unwrap(), path);
    }

    #[test]
    fn test_rejects_invalid_urls() {
        for url in ["", "dropbox://", "http://a/b.mp3", "dropbox:/b.mp3"] {
            assert!(
                matches!(remote_path_from_url(url), Err(DropboxError::InvalidSongUrl(_))),
                "{} should be rejected",
                url
            );
        }
    }

    #[tokio::test]
    async fn test_dead_service_is_not_available() {
        let handler = DropboxUrlHandler::new(Weak::new());
        assert_eq!(handler.scheme(), "dropbox");
        assert!(matches!(
            handler.start_loading("dropbox://b.mp3").await,
            Err(BridgeError::NotAvailable(_))
        ));
        assert!(matches!(
            handler.start_loading_blocking("dropbox://b.mp3"),
            Err(BridgeError::NotAvailable(_))
        ));
    }
}
