//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Comment with its author's username joined in.
///
/// Comments are read-only in this layer; the repository loads them together
/// with the author in one query, ordered by creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentWithAuthor {
    /// Unique identifier
    pub id: i64,
    /// Comment text
    pub text: String,
    /// Creation timestamp
    pub published_at: DateTime<Utc>,
    /// Author's username
    pub author: String,
}
