//! Post repository
//!
//! Database operations for posts. Every returned row is a `PostWithMeta`:
//! the post joined with its author's username and annotated with comment
//! and like counts, all computed in a single statement. The counts use
//! correlated subqueries rather than joins so the two aggregates stay
//! independent of each other.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Post, PostWithMeta};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Get a post by its unique slug, annotated with counts
    async fn get_by_slug(&self, slug: &str) -> Result<Option<PostWithMeta>>;

    /// Most recently published posts, descending by published_at
    async fn most_recent(&self, limit: i64) -> Result<Vec<PostWithMeta>>;

    /// Most liked posts, descending by like count; ties break by slug
    async fn most_popular(&self, limit: i64) -> Result<Vec<PostWithMeta>>;

    /// Posts carrying a tag, most recent first
    async fn list_by_tag(&self, tag_id: i64, limit: i64) -> Result<Vec<PostWithMeta>>;
}

/// SQLx-based post repository supporting SQLite and MySQL
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    /// Create a new SQLx post repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a shared repository for dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn get_by_slug(&self, slug: &str) -> Result<Option<PostWithMeta>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_post_by_slug_sqlite(self.pool.as_sqlite().unwrap(), slug).await
            }
            DatabaseDriver::Mysql => {
                get_post_by_slug_mysql(self.pool.as_mysql().unwrap(), slug).await
            }
        }
    }

    async fn most_recent(&self, limit: i64) -> Result<Vec<PostWithMeta>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                most_recent_sqlite(self.pool.as_sqlite().unwrap(), limit).await
            }
            DatabaseDriver::Mysql => most_recent_mysql(self.pool.as_mysql().unwrap(), limit).await,
        }
    }

    async fn most_popular(&self, limit: i64) -> Result<Vec<PostWithMeta>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                most_popular_sqlite(self.pool.as_sqlite().unwrap(), limit).await
            }
            DatabaseDriver::Mysql => most_popular_mysql(self.pool.as_mysql().unwrap(), limit).await,
        }
    }

    async fn list_by_tag(&self, tag_id: i64, limit: i64) -> Result<Vec<PostWithMeta>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_by_tag_sqlite(self.pool.as_sqlite().unwrap(), tag_id, limit).await
            }
            DatabaseDriver::Mysql => {
                list_by_tag_mysql(self.pool.as_mysql().unwrap(), tag_id, limit).await
            }
        }
    }
}

// Shared projection: the post columns plus author username and both counts.
const POST_META_COLUMNS: &str = r#"
    p.id, p.slug, p.title, p.text, p.image_url, p.author_id, p.published_at,
    u.username AS author,
    (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comments_count,
    (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id) AS likes_count
"#;

fn select_posts(filter_and_order: &str) -> String {
    format!(
        "SELECT {} FROM posts p INNER JOIN users u ON u.id = p.author_id {}",
        POST_META_COLUMNS, filter_and_order
    )
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn get_post_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<Option<PostWithMeta>> {
    let sql = select_posts("WHERE p.slug = ?");
    let row = sqlx::query(&sql)
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by slug")?;

    match row {
        Some(row) => Ok(Some(row_to_post_meta_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn most_recent_sqlite(pool: &SqlitePool, limit: i64) -> Result<Vec<PostWithMeta>> {
    let sql = select_posts("ORDER BY p.published_at DESC, p.id DESC LIMIT ?");
    let rows = sqlx::query(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to list recent posts")?;

    rows.iter().map(row_to_post_meta_sqlite).collect()
}

async fn most_popular_sqlite(pool: &SqlitePool, limit: i64) -> Result<Vec<PostWithMeta>> {
    let sql = select_posts("ORDER BY likes_count DESC, p.slug ASC LIMIT ?");
    let rows = sqlx::query(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to list popular posts")?;

    rows.iter().map(row_to_post_meta_sqlite).collect()
}

async fn list_by_tag_sqlite(pool: &SqlitePool, tag_id: i64, limit: i64) -> Result<Vec<PostWithMeta>> {
    let sql = select_posts(
        "INNER JOIN post_tags pt ON pt.post_id = p.id \
         WHERE pt.tag_id = ? \
         ORDER BY p.published_at DESC, p.id DESC LIMIT ?",
    );
    let rows = sqlx::query(&sql)
        .bind(tag_id)
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to list posts by tag")?;

    rows.iter().map(row_to_post_meta_sqlite).collect()
}

fn row_to_post_meta_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<PostWithMeta> {
    Ok(PostWithMeta {
        post: Post {
            id: row.get("id"),
            slug: row.get("slug"),
            title: row.get("title"),
            text: row.get("text"),
            image_url: row.get("image_url"),
            author_id: row.get("author_id"),
            published_at: row.get("published_at"),
        },
        author: row.get("author"),
        comments_count: row.get("comments_count"),
        likes_count: row.get("likes_count"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn get_post_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<Option<PostWithMeta>> {
    let sql = select_posts("WHERE p.slug = ?");
    let row = sqlx::query(&sql)
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by slug")?;

    match row {
        Some(row) => Ok(Some(row_to_post_meta_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn most_recent_mysql(pool: &MySqlPool, limit: i64) -> Result<Vec<PostWithMeta>> {
    let sql = select_posts("ORDER BY p.published_at DESC, p.id DESC LIMIT ?");
    let rows = sqlx::query(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to list recent posts")?;

    rows.iter().map(row_to_post_meta_mysql).collect()
}

async fn most_popular_mysql(pool: &MySqlPool, limit: i64) -> Result<Vec<PostWithMeta>> {
    let sql = select_posts("ORDER BY likes_count DESC, p.slug ASC LIMIT ?");
    let rows = sqlx::query(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to list popular posts")?;

    rows.iter().map(row_to_post_meta_mysql).collect()
}

async fn list_by_tag_mysql(pool: &MySqlPool, tag_id: i64, limit: i64) -> Result<Vec<PostWithMeta>> {
    let sql = select_posts(
        "INNER JOIN post_tags pt ON pt.post_id = p.id \
         WHERE pt.tag_id = ? \
         ORDER BY p.published_at DESC, p.id DESC LIMIT ?",
    );
    let rows = sqlx::query(&sql)
        .bind(tag_id)
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to list posts by tag")?;

    rows.iter().map(row_to_post_meta_mysql).collect()
}

fn row_to_post_meta_mysql(row: &sqlx::mysql::MySqlRow) -> Result<PostWithMeta> {
    Ok(PostWithMeta {
        post: Post {
            id: row.get("id"),
            slug: row.get("slug"),
            title: row.get("title"),
            text: row.get("text"),
            image_url: row.get("image_url"),
            author_id: row.get("author_id"),
            published_at: row.get("published_at"),
        },
        author: row.get("author"),
        comments_count: row.get("comments_count"),
        likes_count: row.get("likes_count"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use chrono::{Duration, Utc};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxPostRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxPostRepository::new(pool.clone());
        (pool, repo)
    }

    async fn create_test_user(pool: &SqlitePool, username: &str) -> i64 {
        let result = sqlx::query("INSERT INTO users (username) VALUES (?)")
            .bind(username)
            .execute(pool)
            .await
            .expect("Failed to create test user");
        result.last_insert_rowid()
    }

    /// Insert a post published `age` entries back from a fixed base time
    async fn create_test_post(pool: &SqlitePool, author_id: i64, slug: &str, age: i64) -> i64 {
        let published_at = Utc::now() - Duration::minutes(age);
        let result = sqlx::query(
            "INSERT INTO posts (slug, title, text, author_id, published_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(slug)
        .bind(format!("Title for {}", slug))
        .bind(format!("Text for {}", slug))
        .bind(author_id)
        .bind(published_at)
        .execute(pool)
        .await
        .expect("Failed to create test post");
        result.last_insert_rowid()
    }

    async fn add_comment(pool: &SqlitePool, post_id: i64, author_id: i64, text: &str) {
        sqlx::query(
            "INSERT INTO comments (post_id, author_id, text, published_at) VALUES (?, ?, ?, ?)",
        )
        .bind(post_id)
        .bind(author_id)
        .bind(text)
        .bind(Utc::now())
        .execute(pool)
        .await
        .expect("Failed to create test comment");
    }

    async fn add_like(pool: &SqlitePool, post_id: i64, user_id: i64) {
        sqlx::query("INSERT INTO post_likes (post_id, user_id) VALUES (?, ?)")
            .bind(post_id)
            .bind(user_id)
            .execute(pool)
            .await
            .expect("Failed to create test like");
    }

    #[tokio::test]
    async fn test_get_by_slug_with_counts() {
        let (pool, repo) = setup_test_repo().await;
        let sqlite = pool.as_sqlite().unwrap();
        let alice = create_test_user(sqlite, "alice").await;
        let bob = create_test_user(sqlite, "bob").await;

        let post_id = create_test_post(sqlite, alice, "counted-post", 0).await;
        add_comment(sqlite, post_id, bob, "first").await;
        add_comment(sqlite, post_id, bob, "second").await;
        add_comment(sqlite, post_id, alice, "third").await;
        add_like(sqlite, post_id, bob).await;

        let found = repo
            .get_by_slug("counted-post")
            .await
            .expect("Failed to get post")
            .expect("Post not found");

        assert_eq!(found.post.slug, "counted-post");
        assert_eq!(found.author, "alice");
        assert_eq!(found.comments_count, 3);
        assert_eq!(found.likes_count, 1);
    }

    #[tokio::test]
    async fn test_get_by_slug_not_found() {
        let (_pool, repo) = setup_test_repo().await;

        let found = repo
            .get_by_slug("nonexistent")
            .await
            .expect("Failed to get post");

        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_counts_are_zero_without_activity() {
        let (pool, repo) = setup_test_repo().await;
        let sqlite = pool.as_sqlite().unwrap();
        let alice = create_test_user(sqlite, "alice").await;

        create_test_post(sqlite, alice, "quiet-post", 0).await;

        let found = repo
            .get_by_slug("quiet-post")
            .await
            .expect("Failed to get post")
            .expect("Post not found");

        assert_eq!(found.comments_count, 0);
        assert_eq!(found.likes_count, 0);
    }

    #[tokio::test]
    async fn test_most_recent_ordering_and_limit() {
        let (pool, repo) = setup_test_repo().await;
        let sqlite = pool.as_sqlite().unwrap();
        let alice = create_test_user(sqlite, "alice").await;

        // Older posts get a larger age
        for i in 1..=7 {
            create_test_post(sqlite, alice, &format!("post-{}", i), i).await;
        }

        let recent = repo.most_recent(5).await.expect("Failed to list recent");

        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].post.slug, "post-1");
        for pair in recent.windows(2) {
            assert!(
                pair[0].post.published_at > pair[1].post.published_at,
                "posts must be strictly descending by published_at"
            );
        }
    }

    #[tokio::test]
    async fn test_most_recent_fewer_than_limit() {
        let (pool, repo) = setup_test_repo().await;
        let sqlite = pool.as_sqlite().unwrap();
        let alice = create_test_user(sqlite, "alice").await;

        create_test_post(sqlite, alice, "only-post", 0).await;

        let recent = repo.most_recent(5).await.expect("Failed to list recent");
        assert_eq!(recent.len(), 1);
    }

    #[tokio::test]
    async fn test_most_popular_ordering() {
        let (pool, repo) = setup_test_repo().await;
        let sqlite = pool.as_sqlite().unwrap();
        let alice = create_test_user(sqlite, "alice").await;

        let readers: Vec<i64> = {
            let mut ids = Vec::new();
            for i in 0..3 {
                ids.push(create_test_user(sqlite, &format!("reader-{}", i)).await);
            }
            ids
        };

        let loved = create_test_post(sqlite, alice, "loved", 0).await;
        let liked = create_test_post(sqlite, alice, "liked", 1).await;
        create_test_post(sqlite, alice, "ignored", 2).await;

        for reader in &readers {
            add_like(sqlite, loved, *reader).await;
        }
        add_like(sqlite, liked, readers[0]).await;

        let popular = repo.most_popular(3).await.expect("Failed to list popular");

        assert_eq!(popular.len(), 3);
        assert_eq!(popular[0].post.slug, "loved");
        assert_eq!(popular[0].likes_count, 3);
        assert_eq!(popular[1].post.slug, "liked");
        assert_eq!(popular[1].likes_count, 1);
        assert_eq!(popular[2].post.slug, "ignored");
        assert_eq!(popular[2].likes_count, 0);
    }

    #[tokio::test]
    async fn test_most_popular_ties_break_by_slug() {
        let (pool, repo) = setup_test_repo().await;
        let sqlite = pool.as_sqlite().unwrap();
        let alice = create_test_user(sqlite, "alice").await;

        create_test_post(sqlite, alice, "zebra", 0).await;
        create_test_post(sqlite, alice, "apple", 1).await;
        create_test_post(sqlite, alice, "mango", 2).await;

        let popular = repo.most_popular(3).await.expect("Failed to list popular");

        let slugs: Vec<&str> = popular.iter().map(|p| p.post.slug.as_str()).collect();
        assert_eq!(slugs, vec!["apple", "mango", "zebra"]);
    }

    #[tokio::test]
    async fn test_list_by_tag_filters_and_limits() {
        let (pool, repo) = setup_test_repo().await;
        let sqlite = pool.as_sqlite().unwrap();
        let alice = create_test_user(sqlite, "alice").await;

        sqlx::query("INSERT INTO tags (title) VALUES ('rust')")
            .execute(sqlite)
            .await
            .unwrap();
        let tag_id = 1;

        for i in 1..=4 {
            let post_id = create_test_post(sqlite, alice, &format!("tagged-{}", i), i).await;
            sqlx::query("INSERT INTO post_tags (post_id, tag_id) VALUES (?, ?)")
                .bind(post_id)
                .bind(tag_id)
                .execute(sqlite)
                .await
                .unwrap();
        }
        create_test_post(sqlite, alice, "untagged", 0).await;

        let tagged = repo
            .list_by_tag(tag_id, 3)
            .await
            .expect("Failed to list by tag");

        assert_eq!(tagged.len(), 3);
        assert_eq!(tagged[0].post.slug, "tagged-1");
        assert!(tagged.iter().all(|p| p.post.slug.starts_with("tagged-")));
    }
}
