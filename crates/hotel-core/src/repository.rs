//! Repository contracts shared by every storage backend

use crate::models::{Country, CountryDetails, Entity, Hotel};
use crate::paging::{PagedResult, QueryParameters};
use crate::Result;
use async_trait::async_trait;

/// CRUD and paging over one entity set
#[async_trait]
pub trait GenericRepository<T: Entity>: Send + Sync {
    /// Fetch by id; a `None` id yields `None` without touching the store
    async fn get(&self, id: Option<i32>) -> Result<Option<T>>;

    /// Every row ordered by id
    async fn get_all(&self) -> Result<Vec<T>>;

    /// Filtered, ordered page plus the unpaged match count
    async fn get_paged(&self, params: &QueryParameters) -> Result<PagedResult<T>>;

    /// Persist a new row; identity and version are assigned by the store
    async fn add(&self, entity: T) -> Result<T>;

    /// Replace a row if its version still matches
    ///
    /// A missing row and a stale version are both reported as
    /// `HotelError::Concurrency`; callers re-check `exists` to tell them apart.
    async fn update(&self, entity: &T) -> Result<T>;

    /// Remove a row; a missing id is `HotelError::NotFound`
    async fn delete(&self, id: i32) -> Result<()>;

    async fn exists(&self, id: i32) -> Result<bool> {
        Ok(self.get(Some(id)).await?.is_some())
    }
}

/// Country repository with the eager country-with-hotels read
#[async_trait]
pub trait CountriesRepository: GenericRepository<Country> {
    async fn get_details(&self, id: i32) -> Result<Option<CountryDetails>>;
}

/// Hotel repository with the per-country listing
#[async_trait]
pub trait HotelsRepository: GenericRepository<Hotel> {
    async fn get_by_country(&self, country_id: i32) -> Result<Vec<Hotel>>;
}
