use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another process holds the database lock
    #[error("Database is locked by another process. Only one sync process may run at a time.")]
    InstanceLocked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if is_lock_message(&err.to_string()) {
            return DatabaseError::InstanceLocked;
        }
        DatabaseError::Other(err)
    }
}

/// SQLITE_BUSY (5), SQLITE_LOCKED (6) and SQLITE_CANTOPEN (14) messages.
pub(crate) fn is_lock_message(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("database is locked")
        || message.contains("database table is locked")
        || message.contains("sqlite_busy")
        || message.contains("sqlite_locked")
        || message.contains("unable to open database file")
}

// ============================================================================
// Row Types
// ============================================================================

/// Internal row type for news queries.
/// Converts to [`NewsRecord`] once its tags are known.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct NewsDbRow {
    pub id: i64,
    pub external_id: String,
    pub title: String,
    pub body: String,
    pub url: String,
    pub source_created_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl NewsDbRow {
    pub(crate) fn into_record(self, tags: Vec<String>) -> NewsRecord {
        NewsRecord {
            id: self.id,
            external_id: self.external_id,
            title: self.title,
            body: self.body,
            url: self.url,
            source_created_at: self
                .source_created_at
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
            created_at: self.created_at,
            updated_at: self.updated_at,
            tags,
        }
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// A persisted news record.
///
/// `tags` is ordered alphabetically. `created_at`/`updated_at` are unix
/// seconds recorded when the row was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewsRecord {
    pub id: i64,
    pub external_id: String,
    pub title: String,
    pub body: String,
    pub url: String,
    pub source_created_at: Option<DateTime<Utc>>,
    pub created_at: i64,
    pub updated_at: i64,
    pub tags: Vec<String>,
}

/// A tag with the number of news records linked to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct TagCount {
    pub name: String,
    pub news_count: i64,
}
