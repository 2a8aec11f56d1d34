//! Tag service

use crate::db::repositories::TagRepository;
use crate::models::{Tag, TagWithCount};
use anyhow::Context;
use std::collections::HashMap;
use std::sync::Arc;

/// Error types for tag service operations
#[derive(Debug, thiserror::Error)]
pub enum TagServiceError {
    /// Tag not found
    #[error("Tag not found: {0}")]
    NotFound(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Tag service for the read-only blog pages
pub struct TagService {
    repo: Arc<dyn TagRepository>,
}

impl TagService {
    /// Create a new tag service
    pub fn new(repo: Arc<dyn TagRepository>) -> Self {
        Self { repo }
    }

    /// Get a tag by its unique title; a missing title is `NotFound`
    pub async fn get_by_title(&self, title: &str) -> Result<Tag, TagServiceError> {
        self.repo
            .get_by_title(title)
            .await
            .context("Failed to get tag by title")?
            .ok_or_else(|| TagServiceError::NotFound(title.to_string()))
    }

    /// Tags ordered by post count, descending
    pub async fn most_popular(&self, limit: i64) -> Result<Vec<TagWithCount>, TagServiceError> {
        self.repo
            .most_popular(limit)
            .await
            .context("Failed to list popular tags")
            .map_err(Into::into)
    }

    /// Batch-load the tags of the given posts, grouped by post id
    pub async fn for_posts(
        &self,
        post_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<TagWithCount>>, TagServiceError> {
        self.repo
            .for_posts(post_ids)
            .await
            .context("Failed to batch-load tags")
            .map_err(Into::into)
    }
}
