//! Host bridges handed to a provider at startup.
//!
//! [`CoreConfig::builder`] collects the bridges and fails on `build()` if one
//! is missing, so a misconfigured host finds out before the first request.
//! A [`TagReader`] must always be supplied. With the `desktop-shims` feature
//! the HTTP client and the SQLite settings store default to the
//! `bridge-desktop` implementations.
//!
//! ```ignore
//! let config = CoreConfig::builder()
//!     .settings_path("/path/to/settings.db")
//!     .tag_reader(Arc::new(RemoteTagReader::new(http.clone())))
//!     .http_client(http)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{HttpClient, SettingsStore, TagReader, UrlHandlerRegistry};
use std::path::PathBuf;
use std::sync::Arc;

#[cfg(feature = "desktop-shims")]
use std::path::Path;

/// Core configuration shared by provider plugins.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Path to the SQLite settings database
    pub settings_path: PathBuf,

    /// HTTP client for API requests
    pub http_client: Arc<dyn HttpClient>,

    /// Grouped key-value storage for credentials
    pub settings_store: Arc<dyn SettingsStore>,

    /// Tag reader used after a streaming URL is resolved
    pub tag_reader: Arc<dyn TagReader>,

    /// Host registry for `scheme://` song URLs (optional)
    pub url_registry: Option<Arc<dyn UrlHandlerRegistry>>,

    /// Event bus capacity
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("settings_path", &self.settings_path)
            .field("http_client", &"HttpClient { ... }")
            .field("settings_store", &"SettingsStore { ... }")
            .field("tag_reader", &"TagReader { ... }")
            .field(
                "url_registry",
                &self
                    .url_registry
                    .as_ref()
                    .map(|_| "UrlHandlerRegistry { ... }"),
            )
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.settings_path.as_os_str().is_empty() {
            return Err(Error::Config("Settings path cannot be empty".to_string()));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > 65_536 {
            return Err(Error::Config(
                "Event buffer size exceeds maximum of 65,536 events".to_string(),
            ));
        }

        Ok(())
    }
}

fn missing(capability: &str, hint: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: hint.to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::new()
        .map_err(|e| Error::Internal(format!("Failed to create default HttpClient: {}", e)))?;
    let client: Arc<dyn HttpClient> = Arc::new(client);
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(missing(
        "HttpClient",
        "no HTTP stack configured; inject one or enable the 'desktop-shims' feature",
    ))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_settings_store(settings_path: &Path) -> Result<Arc<dyn SettingsStore>> {
    use bridge_desktop::SqliteSettingsStore;
    use std::thread;
    use tokio::runtime::{Builder, Handle};

    // The pool is driven by whichever runtime later awaits it; this runtime
    // only has to live long enough to open the file and create the table.
    let init_store = |path: PathBuf| -> Result<_> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                Error::Internal(format!(
                    "Failed to create Tokio runtime for default settings store: {}",
                    e
                ))
            })?;

        runtime
            .block_on(SqliteSettingsStore::new(path))
            .map_err(|e| {
                Error::Internal(format!("Failed to initialize default SettingsStore: {}", e))
            })
    };

    let path = settings_path.to_path_buf();
    let store = match Handle::try_current() {
        Ok(_) => thread::spawn(move || init_store(path))
            .join()
            .map_err(|_| {
                Error::Internal(
                    "Worker thread panicked while creating default SettingsStore".to_string(),
                )
            })??,
        Err(_) => init_store(path)?,
    };

    let store: Arc<dyn SettingsStore> = Arc::new(store);
    Ok(store)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_settings_store(_settings_path: &std::path::Path) -> Result<Arc<dyn SettingsStore>> {
    Err(missing(
        "SettingsStore",
        "no credential persistence configured; inject the host settings backend \
         or enable the 'desktop-shims' feature",
    ))
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Call [`build()`](CoreConfigBuilder::build) once the bridges are set; the
/// builder reports the first missing capability with an actionable message.
#[derive(Default)]
pub struct CoreConfigBuilder {
    settings_path: Option<PathBuf>,
    http_client: Option<Arc<dyn HttpClient>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    tag_reader: Option<Arc<dyn TagReader>>,
    url_registry: Option<Arc<dyn UrlHandlerRegistry>>,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    /// SQLite file backing the default settings store
    pub fn settings_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.settings_path = Some(path.into());
        self
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    /// Required
    pub fn tag_reader(mut self, reader: Arc<dyn TagReader>) -> Self {
        self.tag_reader = Some(reader);
        self
    }

    pub fn url_registry(mut self, registry: Arc<dyn UrlHandlerRegistry>) -> Self {
        self.url_registry = Some(registry);
        self
    }

    /// Default: [`DEFAULT_EVENT_BUFFER_SIZE`]
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Fails on a missing settings path, a missing bridge, or an event
    /// buffer size outside `1..=65_536`.
    pub fn build(self) -> Result<CoreConfig> {
        let settings_path = self.settings_path.ok_or_else(|| {
            Error::Config("Settings path is required. Use .settings_path() to set it.".to_string())
        })?;

        let tag_reader = self.tag_reader.ok_or_else(|| {
            missing(
                "TagReader",
                "tags are read from remote streams by the host; \
                 inject core_metadata::RemoteTagReader or wrap the player's tag library",
            )
        })?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let settings_store = match self.settings_store {
            Some(store) => store,
            None => provide_default_settings_store(&settings_path)?,
        };

        let config = CoreConfig {
            settings_path,
            http_client,
            settings_store,
            tag_reader,
            url_registry: self.url_registry,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}
