use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;

use super::{BatchWriteError, KeyValueStore, StoreError, StoreResult};

const UPSERT_COLLECTION: &str = "INSERT INTO collections (name, body, updated_at) VALUES (?, ?, ?)
     ON CONFLICT(name) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at";

/// SQLite backend. Each collection is one row; batches run in a single
/// transaction so a cascade writes both collections or neither.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn open(database_path: impl AsRef<Path>) -> StoreResult<Self> {
        let database_path = database_path.as_ref();

        // Create parent directory if it doesn't exist
        if let Some(parent) = database_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        // WAL plus a busy timeout so transient locks are waited on instead of failing
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        log::info!("Collection database: {}", database_path.display());
        Self::from_pool(pool).await
    }

    /// Private in-memory database. Pinned to one connection, since every
    /// SQLite memory connection is its own database.
    pub async fn in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> StoreResult<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let body = sqlx::query_scalar::<_, String>("SELECT body FROM collections WHERE name = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(body)
    }

    async fn set(&self, key: &str, value: String) -> StoreResult<()> {
        sqlx::query(UPSERT_COLLECTION)
            .bind(key)
            .bind(value)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn atomic_batches(&self) -> bool {
        true
    }

    async fn set_many(&self, entries: Vec<(String, String)>) -> Result<(), BatchWriteError> {
        let first_key = entries.first().map(|(k, _)| k.clone()).unwrap_or_default();
        let fail = |failed: String, e: sqlx::Error| BatchWriteError {
            written: Vec::new(),
            failed,
            source: StoreError::Database(e),
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| fail(first_key.clone(), e))?;

        let now = Utc::now();
        for (key, value) in &entries {
            // Dropping the transaction on error rolls back earlier entries
            sqlx::query(UPSERT_COLLECTION)
                .bind(key.as_str())
                .bind(value.as_str())
                .bind(now)
                .execute(&mut *tx)
                .await
                .map_err(|e| fail(key.clone(), e))?;
        }

        tx.commit().await.map_err(|e| fail(first_key, e))?;
        Ok(())
    }
}
