//! inkpress - A small blog publishing site

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use inkpress::{
    config::Config,
    db::{
        self,
        repositories::{SqlxCommentRepository, SqlxPostRepository, SqlxTagRepository},
    },
    pages::{self, AppState},
    services::{CommentService, PostService, TagService},
    theme::ThemeEngine,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkpress=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting inkpress...");

    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    let theme = ThemeEngine::new(&config.theme.path, &config.theme.active)?;
    tracing::info!("Theme loaded: {}", theme.theme_name());

    let state = AppState {
        posts: Arc::new(PostService::new(SqlxPostRepository::boxed(pool.clone()))),
        tags: Arc::new(TagService::new(SqlxTagRepository::boxed(pool.clone()))),
        comments: Arc::new(CommentService::new(SqlxCommentRepository::boxed(pool.clone()))),
        theme: Arc::new(theme),
    };

    let app = pages::build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
