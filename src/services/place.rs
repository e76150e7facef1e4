//! Place service
//!
//! CRUD over bookmarked places plus the map-marker projection used by the
//! frontend map. Places are soft deleted; a deleted place disappears from
//! every query here.

use std::sync::Arc;

use serde::Serialize;

use crate::db::repositories::{MapBounds, PlaceRepository};
use crate::models::{CreatePlaceInput, Place, PlaceType, UpdatePlaceInput};

/// Error types for place operations
#[derive(Debug, thiserror::Error)]
pub enum PlaceServiceError {
    /// Place not found
    #[error("Place not found: {0}")]
    NotFound(i64),

    /// Same name and address already bookmarked
    #[error("Place already exists: {0}")]
    Duplicate(String),

    /// Validation error
    #[error("{0}")]
    Validation(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Slim marker projection for map rendering
#[derive(Debug, Clone, Serialize)]
pub struct PlaceMarker {
    pub id: i64,
    pub name: String,
    pub place_type: PlaceType,
    pub latitude: f64,
    pub longitude: f64,
}

/// Place service
pub struct PlaceService {
    repo: Arc<dyn PlaceRepository>,
}

impl PlaceService {
    pub fn new(repo: Arc<dyn PlaceRepository>) -> Self {
        Self { repo }
    }

    /// Create a place; the same name at the same address is a duplicate
    pub async fn create(&self, input: CreatePlaceInput) -> Result<Place, PlaceServiceError> {
        validate_name(&input.name)?;
        validate_coordinates(input.latitude, input.longitude)?;

        if self
            .repo
            .exists_by_name_and_address(&input.name, &input.address)
            .await?
        {
            return Err(PlaceServiceError::Duplicate(input.name));
        }

        let place = self.repo.create(input).await?;
        tracing::info!("Created place {} ({})", place.id, place.name);
        Ok(place)
    }

    pub async fn get(&self, id: i64) -> Result<Place, PlaceServiceError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or(PlaceServiceError::NotFound(id))
    }

    pub async fn list(&self, place_type: Option<PlaceType>) -> Result<Vec<Place>, PlaceServiceError> {
        Ok(self.repo.list(place_type).await?)
    }

    /// Markers for the map. With bounds, only places inside the viewport;
    /// without (any corner missing upstream), all places.
    pub async fn markers(
        &self,
        place_type: Option<PlaceType>,
        bounds: Option<MapBounds>,
    ) -> Result<Vec<PlaceMarker>, PlaceServiceError> {
        let places = match bounds {
            Some(bounds) => {
                validate_bounds(&bounds)?;
                self.repo.find_in_bounds(bounds, place_type).await?
            }
            None => self.repo.list(place_type).await?,
        };

        Ok(places
            .into_iter()
            .map(|p| PlaceMarker {
                id: p.id,
                name: p.name,
                place_type: p.place_type,
                latitude: p.latitude,
                longitude: p.longitude,
            })
            .collect())
    }

    pub async fn update(&self, id: i64, input: UpdatePlaceInput) -> Result<Place, PlaceServiceError> {
        if let Some(name) = &input.name {
            validate_name(name)?;
        }
        if let (Some(lat), Some(lng)) = (input.latitude, input.longitude) {
            validate_coordinates(lat, lng)?;
        }

        self.repo
            .update(id, input)
            .await?
            .ok_or(PlaceServiceError::NotFound(id))
    }

    pub async fn delete(&self, id: i64) -> Result<(), PlaceServiceError> {
        if !self.repo.delete(id).await? {
            return Err(PlaceServiceError::NotFound(id));
        }
        tracing::info!("Deleted place {}", id);
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), PlaceServiceError> {
    if name.trim().is_empty() {
        return Err(PlaceServiceError::Validation(
            "Place name must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), PlaceServiceError> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(PlaceServiceError::Validation(format!(
            "Latitude out of range: {}",
            latitude
        )));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(PlaceServiceError::Validation(format!(
            "Longitude out of range: {}",
            longitude
        )));
    }
    Ok(())
}

fn validate_bounds(bounds: &MapBounds) -> Result<(), PlaceServiceError> {
    if bounds.south > bounds.north {
        return Err(PlaceServiceError::Validation(
            "South bound must not exceed north bound".to_string(),
        ));
    }
    Ok(())
}
