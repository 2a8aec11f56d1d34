//! Post model
//!
//! This module provides:
//! - `Post`, the stored entity
//! - `PostWithMeta`, a post annotated with its author's username and the
//!   comment/like counts computed by the repository in the same query

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Post entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Unique identifier
    pub id: i64,
    /// URL-friendly slug, the external lookup key
    pub slug: String,
    /// Post title
    pub title: String,
    /// Full post text
    pub text: String,
    /// URL of the post image, if any
    pub image_url: Option<String>,
    /// Author user ID
    pub author_id: i64,
    /// Publication timestamp
    pub published_at: DateTime<Utc>,
}

/// Post annotated with display metadata.
///
/// `comments_count` and `likes_count` come from the aggregate query that
/// fetched the post; consumers must not recount.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostWithMeta {
    /// The post itself
    #[serde(flatten)]
    pub post: Post,
    /// Author's username
    pub author: String,
    /// Number of comments on the post
    pub comments_count: i64,
    /// Number of likes on the post
    pub likes_count: i64,
}
