//! Memo service
//!
//! Memos hang off a place; every operation first checks the place is still
//! visible (not soft deleted).

use std::sync::Arc;

use crate::db::repositories::{MemoRepository, PlaceRepository};
use crate::models::{CreateMemoInput, Memo, UpdateMemoInput};

/// Error types for memo operations
#[derive(Debug, thiserror::Error)]
pub enum MemoServiceError {
    /// Place missing or deleted
    #[error("Place not found: {0}")]
    PlaceNotFound(i64),

    /// Memo not found
    #[error("Memo not found: {0}")]
    NotFound(i64),

    /// Validation error
    #[error("{0}")]
    Validation(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Memo service
pub struct MemoService {
    repo: Arc<dyn MemoRepository>,
    places: Arc<dyn PlaceRepository>,
}

impl MemoService {
    pub fn new(repo: Arc<dyn MemoRepository>, places: Arc<dyn PlaceRepository>) -> Self {
        Self { repo, places }
    }

    pub async fn create(
        &self,
        place_id: i64,
        input: CreateMemoInput,
    ) -> Result<Memo, MemoServiceError> {
        if input.item_name.trim().is_empty() {
            return Err(MemoServiceError::Validation(
                "Item name must not be empty".to_string(),
            ));
        }
        self.ensure_place(place_id).await?;
        Ok(self.repo.create(place_id, input).await?)
    }

    pub async fn list_by_place(&self, place_id: i64) -> Result<Vec<Memo>, MemoServiceError> {
        self.ensure_place(place_id).await?;
        Ok(self.repo.list_by_place(place_id).await?)
    }

    pub async fn update(&self, id: i64, input: UpdateMemoInput) -> Result<Memo, MemoServiceError> {
        if let Some(item_name) = &input.item_name {
            if item_name.trim().is_empty() {
                return Err(MemoServiceError::Validation(
                    "Item name must not be empty".to_string(),
                ));
            }
        }
        self.repo
            .update(id, input)
            .await?
            .ok_or(MemoServiceError::NotFound(id))
    }

    pub async fn delete(&self, id: i64) -> Result<(), MemoServiceError> {
        if !self.repo.delete(id).await? {
            return Err(MemoServiceError::NotFound(id));
        }
        Ok(())
    }

    async fn ensure_place(&self, place_id: i64) -> Result<(), MemoServiceError> {
        if self.places.get_by_id(place_id).await?.is_none() {
            return Err(MemoServiceError::PlaceNotFound(place_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxMemoRepository, SqlxPlaceRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{CreatePlaceInput, PlaceType, Rating};

    async fn service() -> (MemoService, Arc<SqlxPlaceRepository>, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let places = Arc::new(SqlxPlaceRepository::new(pool.clone()));
        let place = places
            .create(CreatePlaceInput {
                name: "Corner Bakery".to_string(),
                place_type: PlaceType::Restaurant,
                address: "8 Mill Rd".to_string(),
                latitude: 37.55,
                longitude: 126.97,
                description: None,
                image_url: None,
            })
            .await
            .expect("place create failed");

        let svc = MemoService::new(Arc::new(SqlxMemoRepository::new(pool)), places.clone());
        (svc, places, place.id)
    }

    fn sample_input() -> CreateMemoInput {
        CreateMemoInput {
            item_name: "croissant".to_string(),
            rating: Rating::Good,
            comment: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let (svc, _, place_id) = service().await;
        svc.create(place_id, sample_input()).await.expect("create failed");

        let memos = svc.list_by_place(place_id).await.expect("list failed");
        assert_eq!(memos.len(), 1);
    }

    #[tokio::test]
    async fn test_create_under_missing_place() {
        let (svc, _, _) = service().await;
        let result = svc.create(999, sample_input()).await;
        assert!(matches!(result, Err(MemoServiceError::PlaceNotFound(999))));
    }

    #[tokio::test]
    async fn test_list_under_deleted_place() {
        let (svc, places, place_id) = service().await;
        svc.create(place_id, sample_input()).await.expect("create failed");
        places.delete(place_id).await.expect("place delete failed");

        let result = svc.list_by_place(place_id).await;
        assert!(matches!(result, Err(MemoServiceError::PlaceNotFound(_))));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (svc, _, place_id) = service().await;
        let memo = svc.create(place_id, sample_input()).await.expect("create failed");

        let updated = svc
            .update(
                memo.id,
                UpdateMemoInput {
                    rating: Some(Rating::Okay),
                    ..Default::default()
                },
            )
            .await
            .expect("update failed");
        assert_eq!(updated.rating, Rating::Okay);

        svc.delete(memo.id).await.expect("delete failed");
        assert!(matches!(
            svc.delete(memo.id).await,
            Err(MemoServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_blank_item_name_rejected() {
        let (svc, _, place_id) = service().await;
        let result = svc
            .create(
                place_id,
                CreateMemoInput {
                    item_name: "  ".to_string(),
                    rating: Rating::Good,
                    comment: None,
                },
            )
            .await;
        assert!(matches!(result, Err(MemoServiceError::Validation(_))));
    }
}
