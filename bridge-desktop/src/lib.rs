//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! This crate provides production-ready implementations of the host bridges
//! a cloud storage provider needs:
//! - `HttpClient` using `reqwest`
//! - `SettingsStore` using SQLite-backed key-value store
//! - `UrlHandlerRegistry` as an in-process scheme map
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ReqwestHttpClient, SqliteSettingsStore};
//! use bridge_traits::{HttpClient, SettingsStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let http_client = ReqwestHttpClient::new()?;
//!     let settings = SqliteSettingsStore::new("settings.db".into()).await?;
//!
//!     // Use in core configuration
//! }
//! ```

mod http;
mod settings;
mod url_handlers;

pub use http::{ReqwestHttpClient, RetryPolicy};
pub use settings::SqliteSettingsStore;
pub use url_handlers::InMemoryUrlHandlerRegistry;
