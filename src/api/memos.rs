//! Memo API endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::api::middleware::{ApiError, AppState};
use crate::models::{CreateMemoInput, Memo, UpdateMemoInput};

/// GET /api/places/{id}/memos
pub async fn list_memos(
    State(state): State<AppState>,
    Path(place_id): Path<i64>,
) -> Result<Json<Vec<Memo>>, ApiError> {
    Ok(Json(state.memo_service.list_by_place(place_id).await?))
}

/// POST /api/places/{id}/memos (admin)
pub async fn create_memo(
    State(state): State<AppState>,
    Path(place_id): Path<i64>,
    Json(input): Json<CreateMemoInput>,
) -> Result<(StatusCode, Json<Memo>), ApiError> {
    let memo = state.memo_service.create(place_id, input).await?;
    Ok((StatusCode::CREATED, Json(memo)))
}

/// PUT /api/memos/{id} (admin)
pub async fn update_memo(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateMemoInput>,
) -> Result<Json<Memo>, ApiError> {
    Ok(Json(state.memo_service.update(id, input).await?))
}

/// DELETE /api/memos/{id} (admin)
pub async fn delete_memo(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.memo_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
