use anyhow::Result;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;

use super::types::{is_lock_message, DatabaseError};

/// Longest tag name the schema accepts.
pub const MAX_TAG_NAME_LEN: usize = 255;

// ============================================================================
// Database
// ============================================================================

#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl Database {
    /// Open a database connection and run migrations
    ///
    /// `path` may be `:memory:` for a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::InstanceLocked` if another process has the
    /// database locked (SQLITE_BUSY, SQLITE_LOCKED, SQLITE_CANTOPEN).
    /// Returns `DatabaseError::Migration` if the schema cannot be applied.
    pub async fn open(path: &str) -> Result<Self, DatabaseError> {
        let url = format!("sqlite:{}?mode=rwc", path);

        // busy_timeout=5000: wait up to 5 seconds for a competing writer before SQLITE_BUSY.
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(DatabaseError::from_sqlx)?
            .foreign_keys(true)
            .pragma("busy_timeout", "5000");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(DatabaseError::from_sqlx)?;
        let db = Self { pool };
        db.migrate().await.map_err(|e| {
            if is_lock_message(&e.to_string()) {
                DatabaseError::InstanceLocked
            } else {
                DatabaseError::Migration(e.to_string())
            }
        })?;
        Ok(db)
    }

    /// Open the database, retrying with linear backoff (1s, 2s, ...).
    ///
    /// Used at process start where an unreachable store is fatal only after
    /// every attempt has failed. Returns the last error.
    pub async fn open_with_retry(path: &str, attempts: u32) -> Result<Self, DatabaseError> {
        let attempts = attempts.max(1);
        let mut attempt = 1;
        loop {
            match Self::open(path).await {
                Ok(db) => return Ok(db),
                Err(e) if attempt < attempts => {
                    tracing::warn!(
                        path = %path,
                        attempt = attempt,
                        max_attempts = attempts,
                        error = %e,
                        "Database open failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_secs(u64::from(attempt))).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(path = %path, attempts = attempts, error = %e, "Database open failed");
                    return Err(e);
                }
            }
        }
    }

    /// Run database migrations atomically within a transaction.
    ///
    /// Every statement uses `IF NOT EXISTS`, so re-running on an existing
    /// database is a no-op.
    async fn migrate(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS news (
                id INTEGER PRIMARY KEY,
                external_id TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                url TEXT NOT NULL,
                source_created_at INTEGER,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        // Names compare with the default BINARY collation: exact, case-sensitive.
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS tags (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE CHECK (length(name) BETWEEN 1 AND {MAX_TAG_NAME_LEN}),
                created_at INTEGER NOT NULL
            )
        "#
        ))
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS news_tags (
                news_id INTEGER NOT NULL REFERENCES news(id) ON DELETE CASCADE,
                tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (news_id, tag_id)
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        // Recent-first listing
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_news_source_created ON news(source_created_at DESC, id)",
        )
        .execute(&mut *tx)
        .await?;

        // Reverse lookup for tag counts
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_news_tags_tag ON news_tags(tag_id)")
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }
}
