//! Authentication API endpoints

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Query, State},
    http::{header, HeaderMap},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{client_ip, ApiError, AppState};
use crate::models::LoginAttempt;

/// Default number of audit rows returned by the attempts endpoint
const DEFAULT_ATTEMPTS_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

/// POST /api/auth/login - exchange the admin password for a session token
pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let ip = client_ip(&headers, peer);
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok());

    let token = state
        .auth_service
        .login(&body.password, &ip, user_agent)
        .await?;

    Ok(Json(LoginResponse { token }))
}

#[derive(Debug, Deserialize)]
pub struct UnblockRequest {
    pub ip: String,
}

/// POST /api/auth/unblock - lift a login block for an IP (admin)
pub async fn unblock(
    State(state): State<AppState>,
    Json(body): Json<UnblockRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.auth_service.unblock(&body.ip).await;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}

#[derive(Debug, Deserialize)]
pub struct AttemptsQuery {
    pub ip: Option<String>,
    pub limit: Option<i64>,
}

/// Current in-memory lockout state for one IP
#[derive(Debug, Serialize)]
pub struct AttemptStateResponse {
    pub count: u32,
    pub blocked_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct AttemptsResponse {
    pub attempts: Vec<LoginAttempt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<AttemptStateResponse>,
}

/// GET /api/auth/attempts - inspect the attempt ledger (admin).
/// With `?ip=` the response also carries the live lockout state.
pub async fn attempts(
    State(state): State<AppState>,
    Query(query): Query<AttemptsQuery>,
) -> Result<Json<AttemptsResponse>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_ATTEMPTS_LIMIT).clamp(1, 500);

    let response = match query.ip {
        Some(ip) => AttemptsResponse {
            attempts: state.auth_service.attempts_for(&ip, limit).await?,
            state: state
                .auth_service
                .attempt_state(&ip)
                .await
                .map(|s| AttemptStateResponse {
                    count: s.count,
                    blocked_until: s.blocked_until,
                }),
        },
        None => AttemptsResponse {
            attempts: state.auth_service.recent_attempts(limit).await?,
            state: None,
        },
    };

    Ok(Json(response))
}
