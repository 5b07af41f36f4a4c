use super::schema::Database;
use super::types::{DatabaseError, TagCount};

impl Database {
    // ========================================================================
    // Tag Queries
    // ========================================================================

    /// All tags with their linked news count, most used first then by name.
    pub async fn tag_counts(&self) -> Result<Vec<TagCount>, DatabaseError> {
        let tags = sqlx::query_as::<_, TagCount>(
            r#"
            SELECT t.name AS name, COUNT(nt.news_id) AS news_count
            FROM tags t
            LEFT JOIN news_tags nt ON nt.tag_id = t.id
            GROUP BY t.id
            ORDER BY news_count DESC, t.name
        "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(tags)
    }
}
