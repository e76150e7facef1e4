//! API layer - HTTP handlers and routing
//!
//! Public surface: places, map markers, memos and the guestbook. Admin
//! surface (behind bearer auth): place/memo mutations, unblocking IPs and
//! attempt-ledger inspection.

pub mod auth;
pub mod guestbook;
pub mod memos;
pub mod middleware;
pub mod places;

use anyhow::Context;
use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use middleware::{ApiError, AppState};

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Admin routes (bearer token required)
    let admin_routes = Router::new()
        .route("/places", post(places::create_place))
        .route(
            "/places/{id}",
            put(places::update_place).delete(places::delete_place),
        )
        .route("/places/{id}/memos", post(memos::create_memo))
        .route(
            "/memos/{id}",
            put(memos::update_memo).delete(memos::delete_memo),
        )
        .route("/auth/unblock", post(auth::unblock))
        .route("/auth/attempts", get(auth::attempts))
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ));

    // Public routes
    Router::new()
        .route("/places", get(places::list_places))
        .route("/places/markers", get(places::markers))
        .route("/places/{id}", get(places::get_place))
        .route("/places/{id}/memos", get(memos::list_memos))
        .route("/auth/login", post(auth::login))
        .route(
            "/guestbook",
            get(guestbook::list_messages).post(guestbook::create_message),
        )
        .route("/guestbook/{id}", delete(guestbook::delete_message))
        .merge(admin_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> anyhow::Result<Router> {
    let cors = CorsLayer::new()
        .allow_origin(
            cors_origin
                .parse::<HeaderValue>()
                .with_context(|| format!("Invalid CORS origin: {}", cors_origin))?,
        )
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Ok(Router::new()
        .nest("/api", build_api_router(state.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}
