//! Place API endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState};
use crate::db::repositories::MapBounds;
use crate::models::{CreatePlaceInput, Place, PlaceType, UpdatePlaceInput};
use crate::services::PlaceMarker;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(rename = "type")]
    pub place_type: Option<PlaceType>,
}

/// GET /api/places - list places, optionally filtered by type
pub async fn list_places(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Place>>, ApiError> {
    Ok(Json(state.place_service.list(query.place_type).await?))
}

#[derive(Debug, Deserialize)]
pub struct MarkersQuery {
    #[serde(rename = "type")]
    pub place_type: Option<PlaceType>,
    pub sw_lat: Option<f64>,
    pub sw_lng: Option<f64>,
    pub ne_lat: Option<f64>,
    pub ne_lng: Option<f64>,
}

/// GET /api/places/markers - map markers, viewport-filtered when all four
/// bounds are present, unfiltered otherwise
pub async fn markers(
    State(state): State<AppState>,
    Query(query): Query<MarkersQuery>,
) -> Result<Json<Vec<PlaceMarker>>, ApiError> {
    let bounds = match (query.sw_lat, query.sw_lng, query.ne_lat, query.ne_lng) {
        (Some(south), Some(west), Some(north), Some(east)) => Some(MapBounds {
            south,
            north,
            west,
            east,
        }),
        _ => None,
    };

    Ok(Json(
        state.place_service.markers(query.place_type, bounds).await?,
    ))
}

/// GET /api/places/{id}
pub async fn get_place(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Place>, ApiError> {
    Ok(Json(state.place_service.get(id).await?))
}

/// POST /api/places (admin)
pub async fn create_place(
    State(state): State<AppState>,
    Json(input): Json<CreatePlaceInput>,
) -> Result<(StatusCode, Json<Place>), ApiError> {
    let place = state.place_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(place)))
}

/// PUT /api/places/{id} (admin)
pub async fn update_place(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<UpdatePlaceInput>,
) -> Result<Json<Place>, ApiError> {
    Ok(Json(state.place_service.update(id, input).await?))
}

/// DELETE /api/places/{id} (admin)
pub async fn delete_place(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.place_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
