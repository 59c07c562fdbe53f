//! Tag Reading Abstraction
//!
//! The host's tag-reading service accepts a remote streaming URL plus the
//! file's size and MIME type, fetches whatever it needs from the stream, and
//! returns the parsed tags asynchronously.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Request to read tags from a file that lives in cloud storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudFileRequest {
    /// Temporary streaming URL the bytes can be fetched from
    pub url: String,
    /// Base name of the remote file (used as a title fallback)
    pub filename: String,
    /// File size in bytes as reported by the storage provider
    pub size: u64,
    /// MIME type as reported by the storage provider
    pub mime_type: String,
    /// Optional `Authorization` header value for URLs that require one
    pub authorization: Option<String>,
}

/// Parsed tag metadata for a single audio file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagData {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    pub genre: Option<String>,
    pub year: Option<u32>,
    pub track_number: Option<u32>,
    pub disc_number: Option<u32>,
    /// Duration in milliseconds
    pub duration_ms: u64,
    /// Bitrate in kbps
    pub bitrate: Option<u32>,
    /// Sample rate in Hz
    pub sample_rate: Option<u32>,
    pub channels: Option<u8>,
    /// Container/codec name as detected from the stream (e.g. "Mpeg", "Vorbis")
    pub format: String,
}

/// Tag-reading service trait
///
/// Implementations may download the whole stream or only the byte ranges that
/// hold tags. They must not retain the request URL beyond the call, since
/// streaming URLs expire.
#[async_trait]
pub trait TagReader: Send + Sync {
    /// Read embedded tags from a remote file
    async fn read_cloud_file(&self, request: CloudFileRequest) -> Result<TagData>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;

    mock! {
        Reader {}

        #[async_trait]
        impl TagReader for Reader {
            async fn read_cloud_file(&self, request: CloudFileRequest) -> Result<TagData>;
        }
    }

    #[tokio::test]
    async fn test_tag_reader_receives_request() {
        let mut reader = MockReader::new();
        reader
            .expect_read_cloud_file()
            .withf(|req| req.filename == "song.ogg" && req.size == 42)
            .times(1)
            .returning(|_| {
                Ok(TagData {
                    title: Some("Song".to_string()),
                    ..TagData::default()
                })
            });

        let tags = reader
            .read_cloud_file(CloudFileRequest {
                url: "https://dl.example.com/song.ogg".to_string(),
                filename: "song.ogg".to_string(),
                size: 42,
                mime_type: "audio/ogg".to_string(),
                authorization: None,
            })
            .await
            .unwrap();

        assert_eq!(tags.title.as_deref(), Some("Song"));
    }
}
