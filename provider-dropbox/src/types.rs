//! Dropbox API v1 wire types

use bridge_traits::tags::CloudFileRequest;
use serde::{Deserialize, Serialize};

/// MIME types the player can stream from Dropbox. Matched exactly.
pub const SUPPORTED_MIME_TYPES: &[&str] = &["audio/ogg", "audio/mpeg"];

/// Returns true if `mime_type` is one of [`SUPPORTED_MIME_TYPES`].
pub fn is_supported_mime_type(mime_type: &str) -> bool {
    SUPPORTED_MIME_TYPES.contains(&mime_type)
}

/// Response from `GET /metadata/dropbox/{path}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingResponse {
    /// Directory children; absent for files
    #[serde(default)]
    pub contents: Vec<MetadataEntry>,
}

/// One child of a directory listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    /// Absolute remote path, e.g. `/Music/song.mp3`
    #[serde(default)]
    pub path: String,

    #[serde(default)]
    pub is_dir: bool,

    /// Empty for directories
    #[serde(default)]
    pub mime_type: String,

    /// Size in bytes
    #[serde(default)]
    pub bytes: u64,
}

impl MetadataEntry {
    /// Last path component
    pub fn filename(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// True for files whose MIME type the player can stream
    pub fn is_playable(&self) -> bool {
        !self.is_dir && is_supported_mime_type(&self.mime_type)
    }
}

/// Response from `POST /media/dropbox/{path}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaResponse {
    /// Temporary streaming URL
    #[serde(default)]
    pub url: String,

    /// Expiry, as formatted by the API
    #[serde(default)]
    pub expires: String,
}

/// Response from `GET /account/info`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    #[serde(default)]
    pub display_name: String,

    #[serde(default)]
    pub uid: u64,
}

/// Form-encoded body of `oauth/request_token` and `oauth/access_token`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenPair {
    pub oauth_token: String,
    pub oauth_token_secret: String,
}

/// A playable file together with its temporary streaming URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub temporary_url: String,
    pub original_path: String,
    pub filename: String,
    pub size: u64,
    pub mime_type: String,
    pub expires: String,
}

impl StreamDescriptor {
    pub fn new(entry: &MetadataEntry, media: MediaResponse) -> Self {
        Self {
            temporary_url: media.url,
            original_path: entry.path.clone(),
            filename: entry.filename().to_string(),
            size: entry.bytes,
            mime_type: entry.mime_type.clone(),
            expires: media.expires,
        }
    }

    /// Tag-read request for this stream. Media URLs are pre-authorized.
    pub fn to_tag_request(&self) -> CloudFileRequest {
        CloudFileRequest {
            url: self.temporary_url.clone(),
            filename: self.filename.clone(),
            size: self.size,
            mime_type: self.mime_type.clone(),
            authorization: None,
        }
    }
}
