//! API handlers

pub mod account;
pub mod countries;
pub mod health;
pub mod hotels;

use crate::error::AppError;
use hotel_core::{Entity, GenericRepository};

/// Reject a PUT whose body names a different record than its path
pub(crate) fn ensure_same_id(path_id: i32, body_id: i32) -> Result<(), AppError> {
    if path_id != body_id {
        return Err(AppError::BadRequest("Invalid Record Id".to_string()));
    }
    Ok(())
}

/// Persist an edited row, telling a lost race apart from a vanished row
///
/// A concurrency failure on a row that no longer exists is a 404; on a row
/// that still exists it is a 409.
pub(crate) async fn save_update<T, R>(repo: &R, entity: &T) -> Result<T, AppError>
where
    T: Entity,
    R: GenericRepository<T> + ?Sized,
{
    match repo.update(entity).await {
        Ok(saved) => Ok(saved),
        Err(err) if err.is_concurrency() => {
            if repo.exists(entity.id()).await? {
                Err(err.into())
            } else {
                Err(hotel_core::HotelError::not_found(T::NAME, entity.id()).into())
            }
        }
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hotel_core::{Country, InMemoryRepository};

    #[test]
    fn test_id_mismatch_is_bad_request() {
        assert!(ensure_same_id(3, 3).is_ok());
        assert!(matches!(ensure_same_id(3, 4), Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_stale_update_of_live_row_conflicts() {
        let repo = InMemoryRepository::<Country>::new();
        let saved = repo.add(Country::new("Jamaica", None)).await.unwrap();

        let mut first = saved.clone();
        first.name = "Jamaica WI".to_string();
        save_update(&repo, &first).await.unwrap();

        let mut stale = saved;
        stale.name = "Xaymaca".to_string();
        let err = save_update(&repo, &stale).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_of_deleted_row_is_not_found() {
        let repo = InMemoryRepository::<Country>::new();
        let saved = repo.add(Country::new("Bahamas", None)).await.unwrap();
        repo.delete(saved.id).await.unwrap();

        let err = save_update(&repo, &saved).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
