//! Repositories
//!
//! Trait-based data access for the blog site. Every listing query returns
//! rows already annotated with their derived counts (comments, likes, posts
//! per tag) so that page rendering never issues per-row follow-up queries.

pub mod comment;
pub mod post;
pub mod tag;

pub use comment::{CommentRepository, SqlxCommentRepository};
pub use post::{PostRepository, SqlxPostRepository};
pub use tag::{SqlxTagRepository, TagRepository};
