//! Tag model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tag entity.
///
/// Tags relate to posts through a many-to-many association; the title is
/// unique and doubles as the lookup key for the tag filter page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    /// Unique identifier
    pub id: i64,
    /// Tag title, unique
    pub title: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Tag with the number of posts carrying it.
///
/// The count is computed by the repository query that loaded the tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagWithCount {
    /// The tag itself
    #[serde(flatten)]
    pub tag: Tag,
    /// Number of posts with this tag
    pub posts_count: i64,
}

impl TagWithCount {
    /// Create a new TagWithCount
    pub fn new(tag: Tag, posts_count: i64) -> Self {
        Self { tag, posts_count }
    }
}
