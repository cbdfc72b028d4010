//! Durable key-value store
//!
//! SQLite-backed storage shared by all actors. Each actor only ever sees a
//! `ScopedStore` bound to its own namespace.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::debug;

use crate::error::AppResult;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS kv (
    namespace TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (namespace, key)
)";

/// Handle to the backing database
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Connect to the database at `url` and make sure the table exists
    pub async fn connect(url: &str) -> AppResult<Self> {
        let mut options = SqlitePoolOptions::new();
        if url.contains(":memory:") {
            // every connection to an in-memory database sees a different one
            options = options
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>);
        }
        let pool = options.connect(url).await?;
        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        debug!("Store ready at {}", url);
        Ok(Self { pool })
    }

    /// Fresh private in-memory database
    pub async fn in_memory() -> AppResult<Self> {
        Self::connect("sqlite::memory:").await
    }

    /// Remove the backing table so every later read and write fails
    #[cfg(test)]
    pub(crate) async fn drop_table(&self) -> AppResult<()> {
        sqlx::query("DROP TABLE kv").execute(&self.pool).await?;
        Ok(())
    }

    /// Storage view restricted to one namespace
    pub fn scoped(&self, namespace: impl Into<String>) -> ScopedStore {
        ScopedStore {
            pool: self.pool.clone(),
            namespace: namespace.into(),
        }
    }
}

/// Storage owned by a single actor instance
#[derive(Debug, Clone)]
pub struct ScopedStore {
    pool: SqlitePool,
    namespace: String,
}

impl ScopedStore {
    /// Read and decode the value under `key`
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        let raw: Option<String> =
            sqlx::query_scalar::<_, String>("SELECT value FROM kv WHERE namespace = ? AND key = ?")
                .bind(&self.namespace)
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Encode and write `value` under `key`, replacing any previous value
    pub async fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> AppResult<()> {
        let raw = serde_json::to_string(value)?;
        sqlx::query(
            "INSERT INTO kv (namespace, key, value) VALUES (?, ?, ?)
             ON CONFLICT (namespace, key) DO UPDATE SET value = excluded.value",
        )
        .bind(&self.namespace)
        .bind(key)
        .bind(raw)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key_is_none() {
        let store = Store::in_memory().await.unwrap();
        let scoped = store.scoped("room:a");

        let value: Option<Vec<String>> = scoped.get("messages").await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_put_then_get_replaces() {
        let store = Store::in_memory().await.unwrap();
        let scoped = store.scoped("directory");

        scoped.put("user:u1", &vec!["r1"]).await.unwrap();
        scoped.put("user:u1", &vec!["r1", "r2"]).await.unwrap();

        let value: Option<Vec<String>> = scoped.get("user:u1").await.unwrap();
        assert_eq!(value, Some(vec!["r1".to_string(), "r2".to_string()]));
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let store = Store::in_memory().await.unwrap();
        let a = store.scoped("room:a");
        let b = store.scoped("room:b");

        a.put("meta", "alpha").await.unwrap();

        let from_b: Option<String> = b.get("meta").await.unwrap();
        assert!(from_b.is_none());
        let from_a: Option<String> = a.get("meta").await.unwrap();
        assert_eq!(from_a.as_deref(), Some("alpha"));
    }

    #[tokio::test]
    async fn test_dropped_table_fails_reads_and_writes() {
        let store = Store::in_memory().await.unwrap();
        let scoped = store.scoped("room:a");
        store.drop_table().await.unwrap();

        assert!(scoped.put("meta", "x").await.is_err());
        assert!(scoped.get::<String>("meta").await.is_err());
    }

    #[tokio::test]
    async fn test_file_store_survives_reconnect() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("chat.db").display());

        let store = Store::connect(&url).await.unwrap();
        store.scoped("room:a").put("meta", "kept").await.unwrap();
        drop(store);

        let store = Store::connect(&url).await.unwrap();
        let value: Option<String> = store.scoped("room:a").get("meta").await.unwrap();
        assert_eq!(value.as_deref(), Some("kept"));
    }
}
