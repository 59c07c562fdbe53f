//! In-process URL handler registry

use bridge_traits::{
    error::{BridgeError, Result},
    url_handler::{scheme_of, LoadResult, UrlHandler, UrlHandlerRegistry},
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Scheme-keyed handler map used by the desktop player.
#[derive(Default)]
pub struct InMemoryUrlHandlerRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn UrlHandler>>>,
}

impl InMemoryUrlHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `url` through the handler registered for its scheme.
    pub async fn load(&self, url: &str) -> Result<LoadResult> {
        let scheme = scheme_of(url)
            .ok_or_else(|| BridgeError::OperationFailed(format!("URL has no scheme: {}", url)))?;

        let handler = self
            .handler_for(scheme)
            .ok_or_else(|| BridgeError::NotAvailable(format!("No handler for scheme {}", scheme)))?;

        handler.start_loading(url).await
    }

    /// Registered schemes, sorted
    pub fn schemes(&self) -> Vec<String> {
        let handlers = self.handlers.read().unwrap_or_else(|e| e.into_inner());
        let mut schemes: Vec<String> = handlers.keys().cloned().collect();
        schemes.sort();
        schemes
    }
}

impl UrlHandlerRegistry for InMemoryUrlHandlerRegistry {
    fn register(&self, handler: Arc<dyn UrlHandler>) {
        let scheme = handler.scheme().to_string();
        debug!(scheme = %scheme, "Registering URL handler");
        self.handlers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(scheme, handler);
    }

    fn unregister(&self, handler: &Arc<dyn UrlHandler>) {
        let mut handlers = self.handlers.write().unwrap_or_else(|e| e.into_inner());
        let scheme = handler.scheme();
        if handlers
            .get(scheme)
            .is_some_and(|current| Arc::ptr_eq(current, handler))
        {
            handlers.remove(scheme);
            debug!(scheme = %scheme, "Unregistered URL handler");
        }
    }

    fn handler_for(&self, scheme: &str) -> Option<Arc<dyn UrlHandler>> {
        self.handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(scheme)
            .cloned()
    }
}
