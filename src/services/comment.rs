//! Comment service

use crate::db::repositories::CommentRepository;
use crate::models::CommentWithAuthor;
use anyhow::{Context, Result};
use std::sync::Arc;

/// Comment service for the read-only blog pages.
///
/// Comments are created elsewhere; this layer only reads them for display.
pub struct CommentService {
    repo: Arc<dyn CommentRepository>,
}

impl CommentService {
    /// Create a new comment service
    pub fn new(repo: Arc<dyn CommentRepository>) -> Self {
        Self { repo }
    }

    /// List a post's comments with authors, oldest first
    pub async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentWithAuthor>> {
        self.repo
            .list_for_post(post_id)
            .await
            .context("Failed to list comments")
    }
}
