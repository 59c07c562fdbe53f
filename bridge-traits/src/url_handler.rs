//! URL Handler Registry
//!
//! Playlists store provider songs as `scheme://path` URLs. The player keeps a
//! registry of handlers keyed by scheme so that such URLs are resolved back
//! into a playable media URL by the provider that owns the scheme.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;

/// Outcome of asking a handler to load a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadResult {
    /// The track can be played from `media_url`.
    TrackAvailable { original: String, media_url: String },
    /// The handler knows the scheme but nothing could be resolved.
    NoMoreTracks { original: String },
}

/// Resolves provider URLs into playable media URLs.
#[async_trait]
pub trait UrlHandler: Send + Sync {
    /// URL scheme this handler owns, without `://`
    fn scheme(&self) -> &str;

    /// Resolve `url` into something the player can stream
    async fn start_loading(&self, url: &str) -> Result<LoadResult>;
}

/// Host-side registry of URL handlers.
pub trait UrlHandlerRegistry: Send + Sync {
    /// Register a handler, replacing any previous handler for the same scheme
    fn register(&self, handler: Arc<dyn UrlHandler>);

    /// Remove `handler`, but only while it is still the one registered for
    /// its scheme. A newer registration for the same scheme is left alone.
    fn unregister(&self, handler: &Arc<dyn UrlHandler>);

    /// Look up the handler for `scheme`
    fn handler_for(&self, scheme: &str) -> Option<Arc<dyn UrlHandler>>;
}

/// Extract the scheme from a `scheme://...` URL.
pub fn scheme_of(url: &str) -> Option<&str> {
    url.split_once("://")
        .map(|(scheme, _)| scheme)
        .filter(|scheme| !scheme.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_of() {
        assert_eq!(scheme_of("dropbox:///Music/a.mp3"), Some("dropbox"));
        assert_eq!(scheme_of("https://example.com"), Some("https"));
        assert_eq!(scheme_of("://nothing"), None);
        assert_eq!(scheme_of("/local/file.mp3"), None);
    }
}
