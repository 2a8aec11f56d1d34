//! Page layer - HTTP handlers and routing
//!
//! One handler per page of the site:
//! - GET /              - home: popular posts, fresh posts, popular tags
//! - GET /posts/{slug}  - post detail with comments and sidebars
//! - GET /tags/{title}  - posts carrying a tag, with sidebars
//! - GET /contacts      - static contacts page
//!
//! Handlers assemble their context from the services (every related entity
//! arrives batch-loaded and pre-counted), then render it through the theme
//! engine. Unknown slugs and tag titles answer 404; everything else that
//! goes wrong is a 500.

pub mod context;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::models::{PostWithMeta, TagWithCount};
use crate::services::{
    CommentService, PostService, PostServiceError, TagService, TagServiceError,
};
use crate::theme::{ThemeEngine, ThemeError};

use self::context::{
    summarize, ContactsContext, ContextError, HomeContext, PostDetailContext, PostSummary,
    TagContext, TagPostsContext,
};

/// Popular-posts count on the home page and in sidebars
const POPULAR_POSTS_LIMIT: i64 = 5;
/// Fresh-posts count on the home page
const FRESH_POSTS_LIMIT: i64 = 5;
/// Popular-tags count on the home page and in sidebars
const POPULAR_TAGS_LIMIT: i64 = 5;
/// Related-posts count on the tag filter page
const TAG_POSTS_LIMIT: i64 = 10;

// Template names are the contract with the theme; renaming one breaks
// every installed theme.
const TEMPLATE_HOME: &str = "index.html";
const TEMPLATE_POST_DETAIL: &str = "post-details.html";
const TEMPLATE_POSTS_LIST: &str = "posts-list.html";
const TEMPLATE_CONTACTS: &str = "contacts.html";

/// Application state containing the shared services
#[derive(Clone)]
pub struct AppState {
    pub posts: Arc<PostService>,
    pub tags: Arc<TagService>,
    pub comments: Arc<CommentService>,
    pub theme: Arc<ThemeEngine>,
}

/// Errors a page handler can answer with
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    /// The requested post or tag does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A context could not be built from the loaded data
    #[error(transparent)]
    Context(#[from] ContextError),

    /// Template rendering failed
    #[error(transparent)]
    Render(#[from] ThemeError),

    /// Storage failure
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<PostServiceError> for PageError {
    fn from(e: PostServiceError) -> Self {
        match e {
            PostServiceError::NotFound(what) => PageError::NotFound(what),
            PostServiceError::InternalError(e) => PageError::Internal(e),
        }
    }
}

impl From<TagServiceError> for PageError {
    fn from(e: TagServiceError) -> Self {
        match e {
            TagServiceError::NotFound(what) => PageError::NotFound(what),
            TagServiceError::InternalError(e) => PageError::Internal(e),
        }
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        match self {
            PageError::NotFound(what) => {
                tracing::debug!("page not found: {}", what);
                (StatusCode::NOT_FOUND, "404 page not found").into_response()
            }
            other => {
                tracing::error!("page request failed: {}", other);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
        }
    }
}

/// Build the site router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/posts/{slug}", get(post_detail))
        .route("/tags/{title}", get(tag_posts))
        .route("/contacts", get(contacts))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

/// GET / - home page
async fn home(State(state): State<AppState>) -> Result<Html<String>, PageError> {
    let ctx = home_context(&state).await?;
    Ok(Html(state.theme.render(TEMPLATE_HOME, &ctx)?))
}

/// GET /posts/{slug} - post detail page
async fn post_detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Html<String>, PageError> {
    let ctx = post_detail_context(&state, &slug).await?;
    Ok(Html(state.theme.render(TEMPLATE_POST_DETAIL, &ctx)?))
}

/// GET /tags/{title} - tag filter page
async fn tag_posts(
    State(state): State<AppState>,
    Path(title): Path<String>,
) -> Result<Html<String>, PageError> {
    let ctx = tag_posts_context(&state, &title).await?;
    Ok(Html(state.theme.render(TEMPLATE_POSTS_LIST, &ctx)?))
}

/// GET /contacts - static contacts page
async fn contacts(State(state): State<AppState>) -> Result<Html<String>, PageError> {
    Ok(Html(state.theme.render(TEMPLATE_CONTACTS, &ContactsContext {})?))
}

// ============================================================================
// Context assembly
// ============================================================================

async fn home_context(state: &AppState) -> Result<HomeContext, PageError> {
    let popular = state.posts.most_popular(POPULAR_POSTS_LIMIT).await?;
    let fresh = state.posts.most_recent(FRESH_POSTS_LIMIT).await?;

    // One batched tag load covers both listings
    let ids = post_ids(popular.iter().chain(fresh.iter()));
    let tag_map = state.tags.for_posts(&ids).await?;

    let popular_tags = state.tags.most_popular(POPULAR_TAGS_LIMIT).await?;

    Ok(HomeContext {
        most_popular_posts: summaries(&popular, &tag_map)?,
        page_posts: summaries(&fresh, &tag_map)?,
        popular_tags: tag_contexts(&popular_tags),
    })
}

async fn post_detail_context(
    state: &AppState,
    slug: &str,
) -> Result<PostDetailContext, PageError> {
    let post = state.posts.get_by_slug(slug).await?;
    let comments = state.comments.list_for_post(post.post.id).await?;

    let popular = state.posts.most_popular(POPULAR_POSTS_LIMIT).await?;

    let mut ids = post_ids(popular.iter());
    if !ids.contains(&post.post.id) {
        ids.push(post.post.id);
    }
    let tag_map = state.tags.for_posts(&ids).await?;
    let own_tags = tag_map.get(&post.post.id).cloned().unwrap_or_default();

    let popular_tags = state.tags.most_popular(POPULAR_TAGS_LIMIT).await?;

    Ok(PostDetailContext {
        post: context::detail(&post, &own_tags, comments),
        popular_tags: tag_contexts(&popular_tags),
        most_popular_posts: summaries(&popular, &tag_map)?,
    })
}

async fn tag_posts_context(state: &AppState, title: &str) -> Result<TagPostsContext, PageError> {
    let tag = state.tags.get_by_title(title).await?;

    let related = state.posts.list_by_tag(tag.id, TAG_POSTS_LIMIT).await?;
    let popular = state.posts.most_popular(POPULAR_POSTS_LIMIT).await?;

    let ids = post_ids(related.iter().chain(popular.iter()));
    let tag_map = state.tags.for_posts(&ids).await?;

    let popular_tags = state.tags.most_popular(POPULAR_TAGS_LIMIT).await?;

    Ok(TagPostsContext {
        tag: tag.title,
        popular_tags: tag_contexts(&popular_tags),
        posts: summaries(&related, &tag_map)?,
        most_popular_posts: summaries(&popular, &tag_map)?,
    })
}

fn post_ids<'a>(posts: impl Iterator<Item = &'a PostWithMeta>) -> Vec<i64> {
    let mut ids: Vec<i64> = posts.map(|p| p.post.id).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

fn summaries(
    posts: &[PostWithMeta],
    tag_map: &HashMap<i64, Vec<TagWithCount>>,
) -> Result<Vec<PostSummary>, ContextError> {
    posts
        .iter()
        .map(|post| {
            let tags = tag_map
                .get(&post.post.id)
                .map(Vec::as_slice)
                .unwrap_or_default();
            summarize(post, tags)
        })
        .collect()
}

fn tag_contexts(tags: &[TagWithCount]) -> Vec<TagContext> {
    tags.iter().map(TagContext::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxCommentRepository, SqlxPostRepository, SqlxTagRepository};
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use axum::body::Body;
    use axum::http::Request;
    use chrono::{Duration, Utc};
    use sqlx::SqlitePool;
    use tempfile::TempDir;
    use tower::ServiceExt;

    /// Minimal theme exercising every context key the pages provide
    fn write_test_theme(dir: &TempDir) {
        let theme_dir = dir.path().join("default");
        std::fs::create_dir_all(&theme_dir).unwrap();
        std::fs::write(
            theme_dir.join("index.html"),
            "popular:{% for p in most_popular_posts %}{{ p.title }};{% endfor %} \
             fresh:{% for p in page_posts %}{{ p.title }};{% endfor %} \
             tags:{% for t in popular_tags %}{{ t.title }}({{ t.posts_with_tag }});{% endfor %}",
        )
        .unwrap();
        std::fs::write(
            theme_dir.join("post-details.html"),
            "{{ post.title }} by {{ post.author }} likes:{{ post.likes_amount }} \
             comments:{% for c in post.comments %}{{ c.author }}:{{ c.text }};{% endfor %}",
        )
        .unwrap();
        std::fs::write(
            theme_dir.join("posts-list.html"),
            "tag:{{ tag }} posts:{% for p in posts %}{{ p.slug }};{% endfor %}",
        )
        .unwrap();
        std::fs::write(theme_dir.join("contacts.html"), "contact us").unwrap();
    }

    async fn setup_state() -> (DynDatabasePool, AppState, TempDir) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let theme_dir = TempDir::new().unwrap();
        write_test_theme(&theme_dir);
        let theme = ThemeEngine::new(theme_dir.path(), "default").expect("Failed to load theme");

        let state = AppState {
            posts: Arc::new(PostService::new(SqlxPostRepository::boxed(pool.clone()))),
            tags: Arc::new(TagService::new(SqlxTagRepository::boxed(pool.clone()))),
            comments: Arc::new(CommentService::new(SqlxCommentRepository::boxed(pool.clone()))),
            theme: Arc::new(theme),
        };

        (pool, state, theme_dir)
    }

    async fn create_user(pool: &SqlitePool, username: &str) -> i64 {
        sqlx::query("INSERT INTO users (username) VALUES (?)")
            .bind(username)
            .execute(pool)
            .await
            .unwrap()
            .last_insert_rowid()
    }

    async fn create_post(pool: &SqlitePool, author: i64, slug: &str, age_minutes: i64) -> i64 {
        sqlx::query(
            "INSERT INTO posts (slug, title, text, author_id, published_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(slug)
        .bind(format!("Title {}", slug))
        .bind(format!("Text of {}", slug))
        .bind(author)
        .bind(Utc::now() - Duration::minutes(age_minutes))
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
    }

    async fn create_tag(pool: &SqlitePool, title: &str) -> i64 {
        sqlx::query("INSERT INTO tags (title) VALUES (?)")
            .bind(title)
            .execute(pool)
            .await
            .unwrap()
            .last_insert_rowid()
    }

    async fn tag_post(pool: &SqlitePool, post: i64, tag: i64) {
        sqlx::query("INSERT INTO post_tags (post_id, tag_id) VALUES (?, ?)")
            .bind(post)
            .bind(tag)
            .execute(pool)
            .await
            .unwrap();
    }

    async fn like_post(pool: &SqlitePool, post: i64, user: i64) {
        sqlx::query("INSERT INTO post_likes (post_id, user_id) VALUES (?, ?)")
            .bind(post)
            .bind(user)
            .execute(pool)
            .await
            .unwrap();
    }

    async fn comment_on(pool: &SqlitePool, post: i64, author: i64, text: &str, order: i64) {
        sqlx::query(
            "INSERT INTO comments (post_id, author_id, text, published_at) VALUES (?, ?, ?, ?)",
        )
        .bind(post)
        .bind(author)
        .bind(text)
        .bind(Utc::now() + Duration::seconds(order))
        .execute(pool)
        .await
        .unwrap();
    }

    /// Seven tagged posts, enough tags and likes to fill every panel
    async fn seed_site(pool: &SqlitePool) {
        let alice = create_user(pool, "alice").await;
        let tag = create_tag(pool, "general").await;
        for i in 0..6 {
            create_tag(pool, &format!("topic-{}", i)).await;
        }
        for i in 1..=7 {
            let post = create_post(pool, alice, &format!("post-{}", i), i).await;
            tag_post(pool, post, tag).await;
        }
    }

    #[tokio::test]
    async fn test_home_context_limits_and_order() {
        let (pool, state, _theme) = setup_state().await;
        seed_site(pool.as_sqlite().unwrap()).await;

        let ctx = home_context(&state).await.expect("Failed to build context");

        assert_eq!(ctx.most_popular_posts.len(), 5);
        assert_eq!(ctx.page_posts.len(), 5);
        assert_eq!(ctx.popular_tags.len(), 5);
        for pair in ctx.page_posts.windows(2) {
            assert!(
                pair[0].published_at > pair[1].published_at,
                "fresh posts must be strictly descending"
            );
        }
    }

    #[tokio::test]
    async fn test_home_context_with_sparse_store() {
        let (pool, state, _theme) = setup_state().await;
        let sqlite = pool.as_sqlite().unwrap();
        let alice = create_user(sqlite, "alice").await;
        let tag = create_tag(sqlite, "only").await;
        let post = create_post(sqlite, alice, "lonely", 0).await;
        tag_post(sqlite, post, tag).await;

        let ctx = home_context(&state).await.expect("Failed to build context");

        assert_eq!(ctx.most_popular_posts.len(), 1);
        assert_eq!(ctx.page_posts.len(), 1);
        assert_eq!(ctx.popular_tags.len(), 1);
    }

    #[tokio::test]
    async fn test_home_page_renders() {
        let (pool, state, _theme) = setup_state().await;
        seed_site(pool.as_sqlite().unwrap()).await;

        let response = build_router(state)
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("Title post-1"));
        assert!(body.contains("general(7)"));
    }

    #[tokio::test]
    async fn test_post_detail_context() {
        let (pool, state, _theme) = setup_state().await;
        let sqlite = pool.as_sqlite().unwrap();
        let alice = create_user(sqlite, "alice").await;
        let bob = create_user(sqlite, "bob").await;
        let tag = create_tag(sqlite, "rust").await;
        let post = create_post(sqlite, alice, "discussed", 0).await;
        tag_post(sqlite, post, tag).await;
        like_post(sqlite, post, bob).await;
        comment_on(sqlite, post, bob, "nice one", 0).await;
        comment_on(sqlite, post, alice, "thanks", 1).await;

        let ctx = post_detail_context(&state, "discussed")
            .await
            .expect("Failed to build context");

        assert_eq!(ctx.post.slug, "discussed");
        assert_eq!(ctx.post.text, "Text of discussed");
        assert_eq!(ctx.post.likes_amount, 1);
        assert_eq!(ctx.post.comments.len(), 2);
        assert_eq!(ctx.post.comments[0].text, "nice one");
        assert_eq!(ctx.post.tags.len(), 1);
        assert_eq!(ctx.post.tags[0].title, "rust");
    }

    #[tokio::test]
    async fn test_post_detail_unknown_slug_is_404() {
        let (pool, state, _theme) = setup_state().await;
        seed_site(pool.as_sqlite().unwrap()).await;

        let response = build_router(state)
            .oneshot(
                Request::builder()
                    .uri("/posts/ghost")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_post_detail_page_renders() {
        let (pool, state, _theme) = setup_state().await;
        let sqlite = pool.as_sqlite().unwrap();
        let alice = create_user(sqlite, "alice").await;
        let tag = create_tag(sqlite, "rust").await;
        let post = create_post(sqlite, alice, "hello", 0).await;
        tag_post(sqlite, post, tag).await;

        let response = build_router(state)
            .oneshot(
                Request::builder()
                    .uri("/posts/hello")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("Title hello by alice"));
    }

    #[tokio::test]
    async fn test_tag_page_context() {
        let (pool, state, _theme) = setup_state().await;
        let sqlite = pool.as_sqlite().unwrap();
        let alice = create_user(sqlite, "alice").await;
        let rust = create_tag(sqlite, "rust").await;
        let other = create_tag(sqlite, "other").await;

        for i in 1..=12 {
            let post = create_post(sqlite, alice, &format!("rusty-{}", i), i).await;
            tag_post(sqlite, post, rust).await;
        }
        let unrelated = create_post(sqlite, alice, "unrelated", 0).await;
        tag_post(sqlite, unrelated, other).await;

        let ctx = tag_posts_context(&state, "rust")
            .await
            .expect("Failed to build context");

        assert_eq!(ctx.tag, "rust");
        // The tag page shows at most ten related posts
        assert_eq!(ctx.posts.len(), 10);
        assert!(ctx.posts.iter().all(|p| p.slug.starts_with("rusty-")));
        assert_eq!(ctx.posts[0].slug, "rusty-1");
    }

    #[tokio::test]
    async fn test_tag_page_unknown_title_is_404() {
        let (pool, state, _theme) = setup_state().await;
        seed_site(pool.as_sqlite().unwrap()).await;

        let response = build_router(state)
            .oneshot(
                Request::builder()
                    .uri("/tags/missing")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_contacts_page_renders_without_data() {
        let (_pool, state, _theme) = setup_state().await;

        let response = build_router(state)
            .oneshot(
                Request::builder()
                    .uri("/contacts")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(String::from_utf8(body.to_vec()).unwrap(), "contact us");
    }
}
