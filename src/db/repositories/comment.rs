//! Comment repository
//!
//! Read access to a post's comments, with the author username joined in so
//! rendering needs no per-comment lookups. Comments come back in creation
//! order.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::CommentWithAuthor;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// List a post's comments with authors, oldest first
    async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentWithAuthor>>;
}

/// SQLx-based comment repository supporting SQLite and MySQL
pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    /// Create a new SQLx comment repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a shared repository for dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentWithAuthor>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_for_post_sqlite(self.pool.as_sqlite().unwrap(), post_id).await
            }
            DatabaseDriver::Mysql => {
                list_for_post_mysql(self.pool.as_mysql().unwrap(), post_id).await
            }
        }
    }
}

const COMMENTS_FOR_POST_SQL: &str = r#"
    SELECT c.id, c.text, c.published_at, u.username AS author
    FROM comments c
    INNER JOIN users u ON u.id = c.author_id
    WHERE c.post_id = ?
    ORDER BY c.published_at ASC, c.id ASC
"#;

async fn list_for_post_sqlite(pool: &SqlitePool, post_id: i64) -> Result<Vec<CommentWithAuthor>> {
    let rows = sqlx::query(COMMENTS_FOR_POST_SQL)
        .bind(post_id)
        .fetch_all(pool)
        .await
        .context("Failed to list comments for post")?;

    Ok(rows
        .iter()
        .map(|row| CommentWithAuthor {
            id: row.get("id"),
            text: row.get("text"),
            published_at: row.get("published_at"),
            author: row.get("author"),
        })
        .collect())
}

async fn list_for_post_mysql(pool: &MySqlPool, post_id: i64) -> Result<Vec<CommentWithAuthor>> {
    let rows = sqlx::query(COMMENTS_FOR_POST_SQL)
        .bind(post_id)
        .fetch_all(pool)
        .await
        .context("Failed to list comments for post")?;

    Ok(rows
        .iter()
        .map(|row| CommentWithAuthor {
            id: row.get("id"),
            text: row.get("text"),
            published_at: row.get("published_at"),
            author: row.get("author"),
        })
        .collect())
}
