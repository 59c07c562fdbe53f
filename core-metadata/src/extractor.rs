//! Audio Tag Extraction
//!
//! Extracts tag metadata from an in-memory audio stream using the `lofty`
//! crate. Supports ID3v2, Vorbis Comments, MP4 tags, FLAC, and the other
//! formats `lofty` can probe.
//!
//! ## Overview
//!
//! - Prefers the primary tag of the container, falling back to the first tag present
//! - Normalizes text (trim, collapse whitespace, strip control characters)
//! - Falls back to the file stem as the title when no tag exists
//!
//! ## Usage
//!
//! ```ignore
//! use core_metadata::extractor::TagExtractor;
//!
//! let extractor = TagExtractor::new();
//! let tags = extractor.extract_from_bytes(&bytes, "song.mp3")?;
//! println!("Title: {}", tags.title.unwrap_or_default());
//! ```

use bridge_traits::tags::TagData;
use lofty::config::ParseOptions;
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey};
use std::io::Cursor;
use tracing::{debug, warn};

use crate::error::{MetadataError, Result};

/// Audio tag extractor
pub struct TagExtractor {
    parse_options: ParseOptions,
}

impl TagExtractor {
    /// Create a new extractor with default parse options
    pub fn new() -> Self {
        Self {
            parse_options: ParseOptions::new(),
        }
    }

    /// Create extractor with custom parse options
    pub fn with_options(parse_options: ParseOptions) -> Self {
        Self { parse_options }
    }

    /// Extract tags from the bytes of an audio file
    ///
    /// `filename` is only used for logging and as the title fallback.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::UnsupportedFormat`] if the container cannot be
    /// identified, or [`MetadataError::ExtractionFailed`] if it cannot be parsed.
    pub fn extract_from_bytes(&self, data: &[u8], filename: &str) -> Result<TagData> {
        debug!(file = filename, bytes = data.len(), "Extracting tags");

        let probe = Probe::new(Cursor::new(data))
            .options(self.parse_options)
            .guess_file_type()
            .map_err(|e| MetadataError::ExtractionFailed(format!("Failed to probe file: {}", e)))?;

        if probe.file_type().is_none() {
            return Err(MetadataError::UnsupportedFormat(filename.to_string()));
        }

        let tagged_file = probe
            .read()
            .map_err(|e| MetadataError::ExtractionFailed(format!("Failed to parse file: {}", e)))?;

        let properties = tagged_file.properties();
        let mut tags = TagData {
            duration_ms: properties.duration().as_millis() as u64,
            bitrate: properties.audio_bitrate(),
            sample_rate: properties.sample_rate(),
            channels: properties.channels(),
            format: format!("{:?}", tagged_file.file_type()),
            ..TagData::default()
        };

        let tag = tagged_file
            .primary_tag()
            .or_else(|| tagged_file.first_tag());

        match tag {
            Some(tag) => {
                tags.title = tag.title().map(|s| Self::normalize_text(s.as_ref()));
                tags.artist = tag.artist().map(|s| Self::normalize_text(s.as_ref()));
                tags.album = tag.album().map(|s| Self::normalize_text(s.as_ref()));
                tags.album_artist = tag
                    .get_string(&ItemKey::AlbumArtist)
                    .map(Self::normalize_text);
                tags.genre = tag.genre().map(|s| Self::normalize_text(s.as_ref()));
                tags.year = tag.year();
                tags.track_number = tag.track();
                tags.disc_number = tag.disk();
            }
            None => {
                warn!(file = filename, "No tags found, using filename as title");
                tags.title = Some(Self::title_from_filename(filename));
            }
        }

        Ok(tags)
    }

    /// Normalize text metadata
    ///
    /// - Trims leading/trailing whitespace
    /// - Normalizes consecutive whitespace to single space
    /// - Removes null bytes and control characters
    pub(crate) fn normalize_text(text: &str) -> String {
        text.split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .chars()
            .filter(|c| !c.is_control())
            .collect()
    }

    fn title_from_filename(filename: &str) -> String {
        let base = filename.rsplit('/').next().unwrap_or(filename);
        let stem = match base.rfind('.') {
            Some(pos) if pos > 0 => &base[..pos],
            _ => base,
        };
        let title = Self::normalize_text(stem);
        if title.is_empty() {
            "Unknown".to_string()
        } else {
            title
        }
    }
}

impl Default for TagExtractor {
    fn default() -> Self {
        Self::new()
    }
}
