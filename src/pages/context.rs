//! Page contexts
//!
//! Typed view models handed to the templates. Everything here is a pure
//! mapping from entities the repositories already loaded; no function in
//! this module touches storage, and no count is ever recomputed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{CommentWithAuthor, PostWithMeta, TagWithCount};

/// Number of characters of post text shown in listings
pub const TEASER_LEN: usize = 200;

/// Errors building a page context
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    /// A listing needs a first tag; a post without tags cannot be listed
    #[error("Post '{slug}' has no tags")]
    MissingTags { slug: String },
}

/// Tag as shown in tag lists and sidebars
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagContext {
    pub title: String,
    pub posts_with_tag: i64,
}

impl From<&TagWithCount> for TagContext {
    fn from(tag: &TagWithCount) -> Self {
        Self {
            title: tag.tag.title.clone(),
            posts_with_tag: tag.posts_count,
        }
    }
}

/// Comment as shown on the post detail page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentContext {
    pub text: String,
    pub published_at: DateTime<Utc>,
    pub author: String,
}

impl From<CommentWithAuthor> for CommentContext {
    fn from(comment: CommentWithAuthor) -> Self {
        Self {
            text: comment.text,
            published_at: comment.published_at,
            author: comment.author,
        }
    }
}

/// Post as shown in listings: truncated text plus counts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostSummary {
    pub title: String,
    pub teaser_text: String,
    pub author: String,
    pub comments_amount: i64,
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
    pub slug: String,
    pub tags: Vec<TagContext>,
    pub first_tag_title: String,
}

/// Post as shown on its detail page: full text, comments and likes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDetail {
    pub title: String,
    pub text: String,
    pub author: String,
    pub comments: Vec<CommentContext>,
    pub likes_amount: i64,
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
    pub slug: String,
    pub tags: Vec<TagContext>,
}

/// Build a listing summary for a post.
///
/// `tags` are the post's tags in loaded order; the first one feeds
/// `first_tag_title`, so a tagless post is an error rather than a
/// malformed summary.
pub fn summarize(post: &PostWithMeta, tags: &[TagWithCount]) -> Result<PostSummary, ContextError> {
    let first_tag = tags.first().ok_or_else(|| ContextError::MissingTags {
        slug: post.post.slug.clone(),
    })?;

    Ok(PostSummary {
        title: post.post.title.clone(),
        teaser_text: teaser(&post.post.text),
        author: post.author.clone(),
        comments_amount: post.comments_count,
        image_url: post.post.image_url.clone(),
        published_at: post.post.published_at,
        slug: post.post.slug.clone(),
        tags: tags.iter().map(TagContext::from).collect(),
        first_tag_title: first_tag.tag.title.clone(),
    })
}

/// Build the detail view of a post
pub fn detail(
    post: &PostWithMeta,
    tags: &[TagWithCount],
    comments: Vec<CommentWithAuthor>,
) -> PostDetail {
    PostDetail {
        title: post.post.title.clone(),
        text: post.post.text.clone(),
        author: post.author.clone(),
        comments: comments.into_iter().map(CommentContext::from).collect(),
        likes_amount: post.likes_count,
        image_url: post.post.image_url.clone(),
        published_at: post.post.published_at,
        slug: post.post.slug.clone(),
        tags: tags.iter().map(TagContext::from).collect(),
    }
}

/// The first `TEASER_LEN` characters of a text, unmarked and character-exact
/// even when that splits a word.
fn teaser(text: &str) -> String {
    text.chars().take(TEASER_LEN).collect()
}

// ============================================================================
// Per-page template contexts
// ============================================================================

/// Context for the home page (`index.html`)
#[derive(Debug, Serialize)]
pub struct HomeContext {
    pub most_popular_posts: Vec<PostSummary>,
    pub page_posts: Vec<PostSummary>,
    pub popular_tags: Vec<TagContext>,
}

/// Context for the post detail page (`post-details.html`)
#[derive(Debug, Serialize)]
pub struct PostDetailContext {
    pub post: PostDetail,
    pub popular_tags: Vec<TagContext>,
    pub most_popular_posts: Vec<PostSummary>,
}

/// Context for the tag filter page (`posts-list.html`)
#[derive(Debug, Serialize)]
pub struct TagPostsContext {
    pub tag: String,
    pub popular_tags: Vec<TagContext>,
    pub posts: Vec<PostSummary>,
    pub most_popular_posts: Vec<PostSummary>,
}

/// Context for the contacts page (`contacts.html`); no data
#[derive(Debug, Serialize)]
pub struct ContactsContext {}
