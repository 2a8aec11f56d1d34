//! Tag repository
//!
//! Database operations for tags. Tags are always loaded with their post
//! count; `for_posts` batch-loads the tags of many posts in one IN-list
//! query so that listing pages never query per post.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Tag, TagWithCount};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::collections::HashMap;
use std::sync::Arc;

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Get a tag by its unique title
    async fn get_by_title(&self, title: &str) -> Result<Option<Tag>>;

    /// Tags ordered by how many posts carry them, descending
    async fn most_popular(&self, limit: i64) -> Result<Vec<TagWithCount>>;

    /// Batch-load the tags of the given posts, grouped by post id.
    ///
    /// Each tag is annotated with its total post count. Within a post the
    /// tags come back in ascending tag id order, which defines the "first
    /// tag" of a post.
    async fn for_posts(&self, post_ids: &[i64]) -> Result<HashMap<i64, Vec<TagWithCount>>>;
}

/// SQLx-based tag repository supporting SQLite and MySQL
pub struct SqlxTagRepository {
    pool: DynDatabasePool,
}

impl SqlxTagRepository {
    /// Create a new SQLx tag repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a shared repository for dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn get_by_title(&self, title: &str) -> Result<Option<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_tag_by_title_sqlite(self.pool.as_sqlite().unwrap(), title).await
            }
            DatabaseDriver::Mysql => {
                get_tag_by_title_mysql(self.pool.as_mysql().unwrap(), title).await
            }
        }
    }

    async fn most_popular(&self, limit: i64) -> Result<Vec<TagWithCount>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                most_popular_sqlite(self.pool.as_sqlite().unwrap(), limit).await
            }
            DatabaseDriver::Mysql => most_popular_mysql(self.pool.as_mysql().unwrap(), limit).await,
        }
    }

    async fn for_posts(&self, post_ids: &[i64]) -> Result<HashMap<i64, Vec<TagWithCount>>> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                tags_for_posts_sqlite(self.pool.as_sqlite().unwrap(), post_ids).await
            }
            DatabaseDriver::Mysql => {
                tags_for_posts_mysql(self.pool.as_mysql().unwrap(), post_ids).await
            }
        }
    }
}

const POPULAR_TAGS_SQL: &str = r#"
    SELECT t.id, t.title, t.created_at, COUNT(pt.post_id) AS posts_count
    FROM tags t
    LEFT JOIN post_tags pt ON pt.tag_id = t.id
    GROUP BY t.id, t.title, t.created_at
    ORDER BY posts_count DESC, t.title ASC
    LIMIT ?
"#;

/// IN-list query for the tags of a set of posts; placeholders are filled in
/// per call since the list length varies.
fn tags_for_posts_sql(post_count: usize) -> String {
    let placeholders = vec!["?"; post_count].join(", ");
    format!(
        r#"
        SELECT pt.post_id AS post_id, t.id, t.title, t.created_at,
               (SELECT COUNT(*) FROM post_tags pc WHERE pc.tag_id = t.id) AS posts_count
        FROM post_tags pt
        INNER JOIN tags t ON t.id = pt.tag_id
        WHERE pt.post_id IN ({})
        ORDER BY pt.post_id ASC, t.id ASC
        "#,
        placeholders
    )
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn get_tag_by_title_sqlite(pool: &SqlitePool, title: &str) -> Result<Option<Tag>> {
    let row = sqlx::query("SELECT id, title, created_at FROM tags WHERE title = ?")
        .bind(title)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by title")?;

    match row {
        Some(row) => Ok(Some(row_to_tag_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn most_popular_sqlite(pool: &SqlitePool, limit: i64) -> Result<Vec<TagWithCount>> {
    let rows = sqlx::query(POPULAR_TAGS_SQL)
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to list popular tags")?;

    rows.iter()
        .map(|row| Ok(TagWithCount::new(row_to_tag_sqlite(row)?, row.get("posts_count"))))
        .collect()
}

async fn tags_for_posts_sqlite(
    pool: &SqlitePool,
    post_ids: &[i64],
) -> Result<HashMap<i64, Vec<TagWithCount>>> {
    let sql = tags_for_posts_sql(post_ids.len());
    let mut query = sqlx::query(&sql);
    for id in post_ids {
        query = query.bind(*id);
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to batch-load tags for posts")?;

    let mut grouped: HashMap<i64, Vec<TagWithCount>> = HashMap::new();
    for row in &rows {
        let post_id: i64 = row.get("post_id");
        grouped
            .entry(post_id)
            .or_default()
            .push(TagWithCount::new(row_to_tag_sqlite(row)?, row.get("posts_count")));
    }

    Ok(grouped)
}

fn row_to_tag_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Tag> {
    Ok(Tag {
        id: row.get("id"),
        title: row.get("title"),
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn get_tag_by_title_mysql(pool: &MySqlPool, title: &str) -> Result<Option<Tag>> {
    let row = sqlx::query("SELECT id, title, created_at FROM tags WHERE title = ?")
        .bind(title)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by title")?;

    match row {
        Some(row) => Ok(Some(row_to_tag_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn most_popular_mysql(pool: &MySqlPool, limit: i64) -> Result<Vec<TagWithCount>> {
    let rows = sqlx::query(POPULAR_TAGS_SQL)
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to list popular tags")?;

    rows.iter()
        .map(|row| Ok(TagWithCount::new(row_to_tag_mysql(row)?, row.get("posts_count"))))
        .collect()
}

async fn tags_for_posts_mysql(
    pool: &MySqlPool,
    post_ids: &[i64],
) -> Result<HashMap<i64, Vec<TagWithCount>>> {
    let sql = tags_for_posts_sql(post_ids.len());
    let mut query = sqlx::query(&sql);
    for id in post_ids {
        query = query.bind(*id);
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to batch-load tags for posts")?;

    let mut grouped: HashMap<i64, Vec<TagWithCount>> = HashMap::new();
    for row in &rows {
        let post_id: i64 = row.get("post_id");
        grouped
            .entry(post_id)
            .or_default()
            .push(TagWithCount::new(row_to_tag_mysql(row)?, row.get("posts_count")));
    }

    Ok(grouped)
}

fn row_to_tag_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Tag> {
    Ok(Tag {
        id: row.get("id"),
        title: row.get("title"),
        created_at: row.get("created_at"),
    })
}
