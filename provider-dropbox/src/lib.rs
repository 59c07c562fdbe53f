//! # Dropbox Provider
//!
//! Browses a Dropbox account through API v1 and exposes its audio files to
//! the player.
//!
//! ## Overview
//!
//! This module provides:
//! - OAuth 1.0 PLAINTEXT request signing and the three-legged authorization flow
//! - Token persistence in the host settings store
//! - Recursive directory scans that resolve streaming URLs and read tags
//! - A `dropbox://` URL handler that turns playlist entries into streams
//!
//! ## Usage
//!
//! ```ignore
//! use provider_dropbox::{ConnectOutcome, DropboxAuthenticator, DropboxConfig, DropboxService};
//!
//! let config = DropboxConfig::new(app_key, app_secret);
//! let service = DropboxService::from_core_config(config.clone(), &core_config).await?;
//!
//! if let ConnectOutcome::AuthenticationRequired = service.connect().await? {
//!     let authenticator = DropboxAuthenticator::new(config, core_config.http_client.clone());
//!     let pending = authenticator.start_authorization().await?;
//!     open_browser(pending.authorize_url());
//!     let result = authenticator.finish_authorization(pending).await?;
//!     let report = service.complete_authentication(result).await?;
//! }
//! ```

pub mod authenticator;
pub mod config;
pub mod credentials;
pub mod error;
pub mod service;
pub mod types;
pub mod url_handler;

pub use authenticator::{
    AuthenticationResult, DropboxAuthenticator, PendingAuthorization, RequestSigner,
};
pub use config::DropboxConfig;
pub use credentials::{CredentialStore, Credentials, SettingsCredentialStore};
pub use error::{DropboxError, Result};
pub use service::{
    ConnectOutcome, DiscoveredTrack, DropboxService, DropboxServiceBuilder, ScanFailure,
    ScanReport, PROVIDER_NAME,
};
pub use core_runtime::events::ScanStage;
pub use types::{is_supported_mime_type, MetadataEntry, StreamDescriptor, SUPPORTED_MIME_TYPES};
pub use url_handler::{remote_path_from_url, song_url_for_path, DropboxUrlHandler, DROPBOX_SCHEME};
