//! Guestbook API endpoints
//!
//! All routes are public; the service enforces the IP-scoped rules. A
//! valid admin token widens delete rights and the `deletable` flags.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};

use crate::api::middleware::{client_ip, is_admin_request, ApiError, AppState};
use crate::models::CreateGuestbookMessageInput;
use crate::services::GuestbookMessageView;

/// GET /api/guestbook - recent messages, oldest first
pub async fn list_messages(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<Json<Vec<GuestbookMessageView>>, ApiError> {
    let ip = client_ip(&headers, peer);
    let is_admin = is_admin_request(&state, &headers);

    Ok(Json(
        state.guestbook_service.list_messages(&ip, is_admin).await?,
    ))
}

/// POST /api/guestbook - leave a message
pub async fn create_message(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(input): Json<CreateGuestbookMessageInput>,
) -> Result<(StatusCode, Json<GuestbookMessageView>), ApiError> {
    let ip = client_ip(&headers, peer);
    let view = state.guestbook_service.create_message(input, &ip).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// DELETE /api/guestbook/{id} - delete an own message, or any as admin
pub async fn delete_message(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let ip = client_ip(&headers, peer);
    let is_admin = is_admin_request(&state, &headers);

    state
        .guestbook_service
        .delete_message(id, &ip, is_admin)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
