//! `SettingsStore` persisted in a SQLite file

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{SettingsStore, SettingsTransaction},
};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS settings (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at INTEGER NOT NULL
    )
"#;

const UPSERT: &str = "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, ?) \
     ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at";

fn db_error(action: &'static str) -> impl FnOnce(sqlx::Error) -> BridgeError {
    move |e| BridgeError::OperationFailed(format!("{}: {}", action, e))
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// One `settings(key, value, updated_at)` table.
///
/// Grouped keys (`Dropbox/access_token`) are stored as-is.
pub struct SqliteSettingsStore {
    pool: SqlitePool,
}

impl SqliteSettingsStore {
    /// Opens `db_path`, creating the file and its parent directories if needed.
    pub async fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(BridgeError::Io)?;
        }

        // sqlx wants forward slashes even on Windows
        let url = format!(
            "sqlite://{}?mode=rwc",
            db_path.to_string_lossy().replace('\\', "/")
        );
        let pool = SqlitePool::connect(&url)
            .await
            .map_err(db_error("Failed to open settings database"))?;

        let store = Self::with_pool(pool).await?;
        debug!(path = ?db_path, "Opened settings store");
        Ok(store)
    }

    /// Private in-memory database; one connection so every query sees it.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(db_error("Failed to open in-memory database"))?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .map_err(db_error("Failed to create settings table"))?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(UPSERT)
            .bind(key)
            .bind(value)
            .bind(unix_now())
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to store setting"))?;

        debug!(key, "Stored setting");
        Ok(())
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to read setting"))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM settings WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete setting"))?;

        debug!(key, removed = result.rows_affected(), "Deleted setting");
        Ok(())
    }

    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.get_string(key).await?.is_some())
    }

    async fn begin_transaction(&self) -> Result<Box<dyn SettingsTransaction + Send>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        Ok(Box::new(SqliteSettingsTransaction { tx: Some(tx) }))
    }
}

/// Writes become visible to other readers only on `commit`.
struct SqliteSettingsTransaction {
    tx: Option<Transaction<'static, Sqlite>>,
}

impl SqliteSettingsTransaction {
    fn open(&mut self) -> Result<&mut Transaction<'static, Sqlite>> {
        self.tx
            .as_mut()
            .ok_or_else(|| BridgeError::OperationFailed("Transaction already finished".to_string()))
    }

    fn finish(&mut self) -> Result<Transaction<'static, Sqlite>> {
        self.tx
            .take()
            .ok_or_else(|| BridgeError::OperationFailed("Transaction already finished".to_string()))
    }
}

#[async_trait]
impl SettingsTransaction for SqliteSettingsTransaction {
    async fn set_string(&mut self, key: &str, value: &str) -> Result<()> {
        let tx = self.open()?;
        sqlx::query(UPSERT)
            .bind(key)
            .bind(value)
            .bind(unix_now())
            .execute(&mut **tx)
            .await
            .map_err(db_error("Failed to store setting"))?;
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<()> {
        self.finish()?
            .commit()
            .await
            .map_err(db_error("Failed to commit settings"))
    }

    async fn rollback(mut self: Box<Self>) -> Result<()> {
        self.finish()?
            .rollback()
            .await
            .map_err(db_error("Failed to roll back settings"))?;
        debug!("Rolled back settings transaction");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_string_operations() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();

        store.set_string("Dropbox/name", "Jane").await.unwrap();
        let value = store.get_string("Dropbox/name").await.unwrap();
        assert_eq!(value, Some("Jane".to_string()));
        assert!(store.has_key("Dropbox/name").await.unwrap());

        store.set_string("Dropbox/name", "John").await.unwrap();
        assert_eq!(
            store.get_string("Dropbox/name").await.unwrap(),
            Some("John".to_string())
        );

        store.delete("Dropbox/name").await.unwrap();
        assert_eq!(store.get_string("Dropbox/name").await.unwrap(), None);
        assert!(!store.has_key("Dropbox/name").await.unwrap());
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = std::env::temp_dir().join(format!("settings-test-{}", std::process::id()));
        let path = dir.join("settings.db");

        {
            let store = SqliteSettingsStore::new(path.clone()).await.unwrap();
            store.set_string("Dropbox/access_token", "tok").await.unwrap();
        }

        let reopened = SqliteSettingsStore::new(path).await.unwrap();
        assert_eq!(
            reopened.get_string("Dropbox/access_token").await.unwrap(),
            Some("tok".to_string())
        );

        drop(reopened);
        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn test_transaction_commit_and_rollback() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();

        let mut tx = store.begin_transaction().await.unwrap();
        tx.set_string("Dropbox/access_token", "token").await.unwrap();
        tx.set_string("Dropbox/access_token_secret", "secret")
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(
            store.get_string("Dropbox/access_token").await.unwrap(),
            Some("token".to_string())
        );
        assert_eq!(
            store.get_string("Dropbox/access_token_secret").await.unwrap(),
            Some("secret".to_string())
        );

        let mut tx = store.begin_transaction().await.unwrap();
        tx.set_string("Dropbox/access_token", "other").await.unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(
            store.get_string("Dropbox/access_token").await.unwrap(),
            Some("token".to_string())
        );
    }
}
