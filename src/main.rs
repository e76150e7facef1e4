//! Spotmark - a small location-bookmarking service

use anyhow::Result;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spotmark::{
    api::{self, AppState},
    config::Config,
    db::{
        self,
        repositories::{
            SqlxGuestbookRepository, SqlxLoginAttemptRepository, SqlxMemoRepository,
            SqlxPlaceRepository,
        },
    },
    services::{AuthService, GuestbookService, MemoService, PlaceService, TokenIssuer},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spotmark=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Spotmark...");

    // Load configuration (file + SPOTMARK_* env overrides)
    let config = Config::load_with_env(Path::new("config.yml"))?;
    config.validate()?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Repositories
    let place_repo = Arc::new(SqlxPlaceRepository::new(pool.clone()));
    let memo_repo = Arc::new(SqlxMemoRepository::new(pool.clone()));
    let guestbook_repo = Arc::new(SqlxGuestbookRepository::new(pool.clone()));
    let attempt_repo = Arc::new(SqlxLoginAttemptRepository::new(pool.clone()));

    // Services
    let tokens = Arc::new(TokenIssuer::new(
        &config.auth.token_secret,
        config.auth.token_ttl_hours,
    ));
    let auth_service = Arc::new(AuthService::new(&config.auth, attempt_repo, tokens));
    let place_service = Arc::new(PlaceService::new(place_repo.clone()));
    let memo_service = Arc::new(MemoService::new(memo_repo, place_repo));
    let guestbook_service = Arc::new(GuestbookService::new(guestbook_repo, &config.guestbook));

    let state = AppState {
        auth_service,
        place_service,
        memo_service,
        guestbook_service,
    };

    // Build router
    let app = api::build_router(state, &config.server.cors_origin)?;

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
