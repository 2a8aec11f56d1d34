//! Post service

use crate::db::repositories::PostRepository;
use crate::models::PostWithMeta;
use anyhow::Context;
use std::sync::Arc;

/// Error types for post service operations
#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    /// Post not found
    #[error("Post not found: {0}")]
    NotFound(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Post service for the read-only blog pages
pub struct PostService {
    repo: Arc<dyn PostRepository>,
}

impl PostService {
    /// Create a new post service
    pub fn new(repo: Arc<dyn PostRepository>) -> Self {
        Self { repo }
    }

    /// Get a post by slug.
    ///
    /// A missing slug is a `NotFound` error, not an empty result: the
    /// detail page must answer 404, never a substitute page.
    pub async fn get_by_slug(&self, slug: &str) -> Result<PostWithMeta, PostServiceError> {
        self.repo
            .get_by_slug(slug)
            .await
            .context("Failed to get post by slug")?
            .ok_or_else(|| PostServiceError::NotFound(slug.to_string()))
    }

    /// Most liked posts
    pub async fn most_popular(&self, limit: i64) -> Result<Vec<PostWithMeta>, PostServiceError> {
        self.repo
            .most_popular(limit)
            .await
            .context("Failed to list popular posts")
            .map_err(Into::into)
    }

    /// Most recently published posts
    pub async fn most_recent(&self, limit: i64) -> Result<Vec<PostWithMeta>, PostServiceError> {
        self.repo
            .most_recent(limit)
            .await
            .context("Failed to list recent posts")
            .map_err(Into::into)
    }

    /// Posts carrying a tag, most recent first
    pub async fn list_by_tag(
        &self,
        tag_id: i64,
        limit: i64,
    ) -> Result<Vec<PostWithMeta>, PostServiceError> {
        self.repo
            .list_by_tag(tag_id, limit)
            .await
            .context("Failed to list posts by tag")
            .map_err(Into::into)
    }
}
