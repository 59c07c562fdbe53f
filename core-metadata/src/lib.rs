//! # Tag Metadata Module
//!
//! Reads embedded tags from audio streams held in cloud storage.
//!
//! ## Overview
//!
//! This module handles:
//! - Audio tag extraction from in-memory bytes (ID3, Vorbis, MP4, FLAC) via `lofty`
//! - A [`RemoteTagReader`] that downloads a streaming URL through the host
//!   `HttpClient` and implements the `TagReader` bridge

pub mod error;
pub mod extractor;
pub mod remote;

pub use error::{MetadataError, Result};
pub use extractor::TagExtractor;
pub use remote::RemoteTagReader;
