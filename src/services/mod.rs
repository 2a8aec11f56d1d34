//! Services
//!
//! Thin business layer over the repositories. The services' main job in
//! this read-only site is turning zero-row lookups into typed NotFound
//! errors that the page layer maps onto HTTP 404.

pub mod comment;
pub mod post;
pub mod tag;

pub use comment::CommentService;
pub use post::{PostService, PostServiceError};
pub use tag::{TagService, TagServiceError};
