//! Stored OAuth token pair

use async_trait::async_trait;
use bridge_traits::storage::{group_key, SettingsStore};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::Result;

const ACCESS_TOKEN_KEY: &str = "access_token";
const ACCESS_TOKEN_SECRET_KEY: &str = "access_token_secret";
const NAME_KEY: &str = "name";

/// OAuth 1.0 token and token secret.
///
/// Both empty means "not connected".
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub token_secret: String,
}

impl Credentials {
    pub fn new(token: impl Into<String>, token_secret: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            token_secret: token_secret.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.token.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &if self.token.is_empty() { "" } else { "[REDACTED]" })
            .field("token_secret", &"[REDACTED]")
            .finish()
    }
}

/// Persistence for the provider's token pair.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load stored credentials, `None` if nothing usable is stored
    async fn load(&self) -> Result<Option<Credentials>>;

    /// Persist credentials and the account display name together
    async fn save(&self, credentials: &Credentials, name: &str) -> Result<()>;
}

/// [`CredentialStore`] over the host's grouped settings.
///
/// Keys: `{group}/access_token`, `{group}/access_token_secret`, `{group}/name`.
pub struct SettingsCredentialStore {
    settings: Arc<dyn SettingsStore>,
    group: String,
}

impl SettingsCredentialStore {
    pub fn new(settings: Arc<dyn SettingsStore>, group: impl Into<String>) -> Self {
        Self {
            settings,
            group: group.into(),
        }
    }

    fn key(&self, key: &str) -> String {
        group_key(&self.group, key)
    }

    /// Display name saved with the last successful authentication
    pub async fn account_name(&self) -> Result<Option<String>> {
        Ok(self.settings.get_string(&self.key(NAME_KEY)).await?)
    }
}

#[async_trait]
impl CredentialStore for SettingsCredentialStore {
    #[instrument(skip(self), fields(group = %self.group))]
    async fn load(&self) -> Result<Option<Credentials>> {
        let token = self
            .settings
            .get_string(&self.key(ACCESS_TOKEN_KEY))
            .await?
            .unwrap_or_default();
        let token_secret = self
            .settings
            .get_string(&self.key(ACCESS_TOKEN_SECRET_KEY))
            .await?
            .unwrap_or_default();

        let credentials = Credentials::new(token, token_secret);
        if credentials.is_empty() {
            debug!("No stored credentials");
            return Ok(None);
        }

        debug!("Loaded stored credentials");
        Ok(Some(credentials))
    }

    #[instrument(skip(self, credentials), fields(group = %self.group))]
    async fn save(&self, credentials: &Credentials, name: &str) -> Result<()> {
        let mut tx = self.settings.begin_transaction().await?;
        tx.set_string(&self.key(ACCESS_TOKEN_KEY), &credentials.token)
            .await?;
        tx.set_string(&self.key(ACCESS_TOKEN_SECRET_KEY), &credentials.token_secret)
            .await?;
        tx.set_string(&self.key(NAME_KEY), name).await?;
        tx.commit().await?;

        debug!("Saved credentials");
        Ok(())
    }
}
