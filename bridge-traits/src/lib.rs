//! # Host Bridge Traits
//!
//! Host abstraction traits that a media player must implement for cloud
//! storage providers to plug into it.
//!
//! ## Overview
//!
//! This crate defines the contract between provider plugins and the host
//! application. Each trait represents a capability that a provider requires
//! but that the host owns (network stack, settings persistence, tag reading,
//! player URL dispatch).
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Async HTTP requests through the host network stack
//!
//! ### Persistence
//! - [`SettingsStore`](storage::SettingsStore) - Grouped key-value preferences storage
//!
//! ### Player Integration
//! - [`TagReader`](tags::TagReader) - Read embedded tags from a remote stream
//! - [`UrlHandler`](url_handler::UrlHandler) - Resolve `scheme://path` song URLs
//! - [`UrlHandlerRegistry`](url_handler::UrlHandlerRegistry) - Scheme to handler dispatch
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type for consistent
//! error handling. Host implementations should:
//!
//! - Convert platform-specific errors to `BridgeError`
//! - Provide actionable error messages
//! - Include error context (e.g., URLs, setting keys)
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds to support safe concurrent usage
//! across async tasks. Implementations must ensure thread safety.
//!
//! ## Examples
//!
//! ### Implementing HttpClient
//!
//! ```ignore
//! use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
//! use bridge_traits::error::Result;
//! use async_trait::async_trait;
//!
//! pub struct MyHttpClient {
//!     client: reqwest::Client,
//! }
//!
//! #[async_trait]
//! impl HttpClient for MyHttpClient {
//!     async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
//!         // Implementation
//!         todo!()
//!     }
//! }
//! ```

pub mod error;
pub mod http;
pub mod storage;
pub mod tags;
pub mod time;
pub mod url_handler;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use storage::{SettingsStore, SettingsTransaction};
pub use tags::{CloudFileRequest, TagData, TagReader};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, SystemClock};
pub use url_handler::{LoadResult, UrlHandler, UrlHandlerRegistry};
