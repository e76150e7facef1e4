//! API middleware and shared HTTP plumbing
//!
//! Bearer token authentication, client IP resolution and the structured
//! error body every endpoint uses.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::services::{
    AuthService, AuthServiceError, GuestbookService, GuestbookServiceError, MemoService,
    MemoServiceError, PlaceService, PlaceServiceError,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub place_service: Arc<PlaceService>,
    pub memo_service: Arc<MemoService>,
    pub guestbook_service: Arc<GuestbookService>,
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn too_many_attempts(message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::with_details("TOO_MANY_ATTEMPTS", message, details)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            "TOO_MANY_ATTEMPTS" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

impl From<AuthServiceError> for ApiError {
    fn from(err: AuthServiceError) -> Self {
        match err {
            AuthServiceError::InvalidPassword => ApiError::unauthorized("Invalid password"),
            AuthServiceError::Blocked { blocked_until } => ApiError::too_many_attempts(
                err.to_string(),
                serde_json::json!({ "blocked_until": blocked_until.to_rfc3339() }),
            ),
            AuthServiceError::Token(e) => ApiError::internal_error(e.to_string()),
            AuthServiceError::Internal(e) => {
                tracing::error!("Auth service error: {:#}", e);
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

impl From<GuestbookServiceError> for ApiError {
    fn from(err: GuestbookServiceError) -> Self {
        match &err {
            GuestbookServiceError::Validation(msg) => ApiError::validation_error(msg),
            GuestbookServiceError::Cooldown {
                retry_after_seconds,
            } => ApiError::too_many_attempts(
                err.to_string(),
                serde_json::json!({ "scope": "cooldown", "retry_after_seconds": retry_after_seconds }),
            ),
            GuestbookServiceError::PerIpQuota { limit } => ApiError::too_many_attempts(
                err.to_string(),
                serde_json::json!({ "scope": "per_ip_daily", "limit": limit }),
            ),
            GuestbookServiceError::GlobalQuota { limit } => ApiError::too_many_attempts(
                err.to_string(),
                serde_json::json!({ "scope": "global_daily", "limit": limit }),
            ),
            GuestbookServiceError::NotFound => ApiError::not_found("Message not found"),
            GuestbookServiceError::Unauthorized => {
                ApiError::unauthorized("Not allowed to delete this message")
            }
            GuestbookServiceError::Internal(e) => {
                tracing::error!("Guestbook service error: {:#}", e);
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

impl From<PlaceServiceError> for ApiError {
    fn from(err: PlaceServiceError) -> Self {
        match &err {
            PlaceServiceError::NotFound(_) => ApiError::not_found(err.to_string()),
            PlaceServiceError::Duplicate(_) => ApiError::conflict(err.to_string()),
            PlaceServiceError::Validation(msg) => ApiError::validation_error(msg),
            PlaceServiceError::Internal(e) => {
                tracing::error!("Place service error: {:#}", e);
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

impl From<MemoServiceError> for ApiError {
    fn from(err: MemoServiceError) -> Self {
        match &err {
            MemoServiceError::PlaceNotFound(_) | MemoServiceError::NotFound(_) => {
                ApiError::not_found(err.to_string())
            }
            MemoServiceError::Validation(msg) => ApiError::validation_error(msg),
            MemoServiceError::Internal(e) => {
                tracing::error!("Memo service error: {:#}", e);
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

/// Extract the bearer token from a request's Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(String::from)
}

/// Whether the request carries a valid admin token
pub fn is_admin_request(state: &AppState, headers: &HeaderMap) -> bool {
    extract_bearer_token(headers)
        .map(|token| state.auth_service.verify_token(&token))
        .unwrap_or(false)
}

/// Authentication middleware for admin-only routes
pub async fn require_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    if !state.auth_service.verify_token(&token) {
        return Err(ApiError::unauthorized("Invalid or expired token"));
    }

    Ok(next.run(request).await)
}

/// Resolve the client IP: `X-Real-IP`, then the first `X-Forwarded-For`
/// entry, then the socket peer address.
pub fn client_ip(headers: &HeaderMap, peer: SocketAddr) -> String {
    if let Some(real_ip) = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return real_ip.to_string();
    }

    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return forwarded.to_string();
    }

    peer.ip().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> SocketAddr {
        "192.168.1.50:44122".parse().unwrap()
    }

    #[test]
    fn test_client_ip_prefers_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("203.0.113.7"));
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("198.51.100.1, 10.0.0.1"),
        );
        assert_eq!(client_ip(&headers, peer()), "203.0.113.7");
    }

    #[test]
    fn test_client_ip_first_forwarded_entry() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("198.51.100.1, 10.0.0.1"),
        );
        assert_eq!(client_ip(&headers, peer()), "198.51.100.1");
    }

    #[test]
    fn test_client_ip_falls_back_to_peer() {
        let headers = HeaderMap::new();
        assert_eq!(client_ip(&headers, peer()), "192.168.1.50");
    }

    #[test]
    fn test_client_ip_ignores_blank_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("  "));
        assert_eq!(client_ip(&headers, peer()), "192.168.1.50");
    }

    #[test]
    fn test_bearer_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc.def"),
        );
        assert_eq!(extract_bearer_token(&headers), Some("abc.def".to_string()));

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        assert_eq!(extract_bearer_token(&headers), None);
    }
}
