//! Settings Storage Abstractions
//!
//! Provides a platform-agnostic key-value settings store. Providers keep their
//! persisted values (credentials, account names) in named groups of this store.

use async_trait::async_trait;

use crate::error::Result;

/// Key-value settings storage trait
///
/// Abstracts platform-specific preferences/settings storage:
/// - Desktop: SQLite-backed store or OS-specific preferences
/// - Mobile: UserDefaults / SharedPreferences
/// - Web: localStorage / IndexedDB
///
/// Keys are flat strings. Groups are expressed by prefixing the key with the
/// group name and a `/`, e.g. `Dropbox/access_token`.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SettingsStore;
///
/// async fn save_account(store: &dyn SettingsStore) -> Result<()> {
///     store.set_string("Dropbox/name", "Jane Doe").await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Store a string value
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a string value
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Delete a setting
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if a setting exists
    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.get_string(key).await?.is_some())
    }

    /// Begin a transaction for atomic updates
    ///
    /// Changes become visible only after [`SettingsTransaction::commit`].
    async fn begin_transaction(&self) -> Result<Box<dyn SettingsTransaction + Send>>;
}

/// Transaction for atomic settings updates
#[async_trait]
pub trait SettingsTransaction: Send {
    /// Set a value within the transaction
    async fn set_string(&mut self, key: &str, value: &str) -> Result<()>;

    /// Commit the transaction
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Rollback the transaction
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Join a settings group and a key into the flat key used by [`SettingsStore`].
pub fn group_key(group: &str, key: &str) -> String {
    if group.is_empty() {
        key.to_string()
    } else {
        format!("{}/{}", group, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_key() {
        assert_eq!(group_key("Dropbox", "access_token"), "Dropbox/access_token");
        assert_eq!(group_key("", "name"), "name");
    }
}
