use async_trait::async_trait;
use sqlx::{QueryBuilder, SqliteConnection};
use std::collections::HashMap;

use super::schema::Database;
use super::types::{DatabaseError, NewsDbRow, NewsRecord};
use crate::feed::FeedRecord;

/// Maximum number of records returned by [`Database::recent_news`].
const MAX_RECENT: i64 = 1000;

/// Persistence seam used by the sync engine.
///
/// `insert_or_fetch` is idempotent: a record whose external id is already
/// stored resolves to the existing row, and tag links are never duplicated.
#[async_trait]
pub trait NewsStore: Send + Sync {
    /// Whether a record with this external id is already stored.
    async fn exists(&self, external_id: &str) -> Result<bool, DatabaseError>;

    /// Stores the record and links its tags in one transaction, returning
    /// the record's id. On error nothing from this call is committed.
    async fn insert_or_fetch(&self, record: &FeedRecord) -> Result<i64, DatabaseError>;
}

#[async_trait]
impl NewsStore for Database {
    async fn exists(&self, external_id: &str) -> Result<bool, DatabaseError> {
        let (found,): (i64,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM news WHERE external_id = ?)")
                .bind(external_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(found != 0)
    }

    async fn insert_or_fetch(&self, record: &FeedRecord) -> Result<i64, DatabaseError> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        let news_id = upsert_news(&mut tx, record, now).await?;
        for name in &record.tags {
            let tag_id = upsert_tag(&mut tx, name, now).await?;
            sqlx::query(
                r#"
                INSERT INTO news_tags (news_id, tag_id, created_at)
                VALUES (?, ?, ?)
                ON CONFLICT(news_id, tag_id) DO NOTHING
            "#,
            )
            .bind(news_id)
            .bind(tag_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(news_id)
    }
}

/// Insert the news row, or return the id of the row already holding its external id.
async fn upsert_news(
    conn: &mut SqliteConnection,
    record: &FeedRecord,
    now: i64,
) -> Result<i64, sqlx::Error> {
    let inserted: Option<(i64,)> = sqlx::query_as(
        r#"
        INSERT INTO news (external_id, title, body, url, source_created_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(external_id) DO NOTHING
        RETURNING id
    "#,
    )
    .bind(&record.external_id)
    .bind(&record.title)
    .bind(&record.body)
    .bind(&record.url)
    .bind(record.source_timestamp.map(|ts| ts.timestamp()))
    .bind(now)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some((id,)) = inserted {
        return Ok(id);
    }

    tracing::debug!(external_id = %record.external_id, "News row already present, reusing id");
    let (id,): (i64,) = sqlx::query_as("SELECT id FROM news WHERE external_id = ?")
        .bind(&record.external_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(id)
}

/// Insert the tag by exact name, or return the existing tag's id.
async fn upsert_tag(conn: &mut SqliteConnection, name: &str, now: i64) -> Result<i64, sqlx::Error> {
    let inserted: Option<(i64,)> = sqlx::query_as(
        "INSERT INTO tags (name, created_at) VALUES (?, ?) ON CONFLICT(name) DO NOTHING RETURNING id",
    )
    .bind(name)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some((id,)) = inserted {
        return Ok(id);
    }

    let (id,): (i64,) = sqlx::query_as("SELECT id FROM tags WHERE name = ?")
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;
    Ok(id)
}

impl Database {
    // ========================================================================
    // News Queries
    // ========================================================================

    /// Get one news record by external id, with its tags in alphabetical order.
    pub async fn get_news(&self, external_id: &str) -> Result<Option<NewsRecord>, DatabaseError> {
        let row = sqlx::query_as::<_, NewsDbRow>(
            r#"
            SELECT id, external_id, title, body, url, source_created_at, created_at, updated_at
            FROM news
            WHERE external_id = ?
        "#,
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut tags = self.tags_for(&[row.id]).await?;
        let tags = tags.remove(&row.id).unwrap_or_default();
        Ok(Some(row.into_record(tags)))
    }

    /// Most recent news first (by source timestamp, undated records last).
    ///
    /// `limit` is capped at 1000.
    pub async fn recent_news(&self, limit: i64) -> Result<Vec<NewsRecord>, DatabaseError> {
        let limit = limit.clamp(0, MAX_RECENT);
        let rows = sqlx::query_as::<_, NewsDbRow>(
            r#"
            SELECT id, external_id, title, body, url, source_created_at, created_at, updated_at
            FROM news
            ORDER BY source_created_at IS NULL, source_created_at DESC, id
            LIMIT ?
        "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let mut tags = self.tags_for(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let row_tags = tags.remove(&row.id).unwrap_or_default();
                row.into_record(row_tags)
            })
            .collect())
    }

    /// Number of stored news records.
    pub async fn count_news(&self) -> Result<i64, DatabaseError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM news")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Tag names per news id, each list sorted alphabetically.
    async fn tags_for(&self, news_ids: &[i64]) -> Result<HashMap<i64, Vec<String>>, DatabaseError> {
        let mut by_news: HashMap<i64, Vec<String>> = HashMap::new();
        if news_ids.is_empty() {
            return Ok(by_news);
        }

        let mut builder: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(
            "SELECT nt.news_id, t.name FROM news_tags nt JOIN tags t ON t.id = nt.tag_id WHERE nt.news_id IN (",
        );
        let mut separated = builder.separated(", ");
        for id in news_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY t.name");

        let rows: Vec<(i64, String)> = builder.build_query_as().fetch_all(&self.pool).await?;
        for (news_id, name) in rows {
            by_news.entry(news_id).or_default().push(name);
        }
        Ok(by_news)
    }
}
