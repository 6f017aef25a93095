//! In-memory repository backend
//!
//! Used by the test suites and by the API server when no database URL is
//! configured. Tables live behind `tokio::sync::RwLock`; when both tables are
//! locked, countries are always locked before hotels.

use crate::models::{Country, CountryDetails, Entity, Hotel, INITIAL_VERSION};
use crate::paging::{paginate, PagedResult, QueryParameters};
use crate::repository::{CountriesRepository, GenericRepository, HotelsRepository};
use crate::{HotelError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug)]
struct Table<T> {
    rows: BTreeMap<i32, T>,
    next_id: i32,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<T: Entity> Table<T> {
    fn insert(&mut self, mut entity: T) -> T {
        entity.set_id(self.next_id);
        entity.set_version(INITIAL_VERSION);
        self.next_id += 1;
        self.rows.insert(entity.id(), entity.clone());
        entity
    }

    fn replace(&mut self, entity: &T) -> Result<T> {
        let conflict = || HotelError::Concurrency {
            entity: T::NAME,
            id: entity.id(),
        };

        let stored = self.rows.get_mut(&entity.id()).ok_or_else(conflict)?;
        if stored.version() != entity.version() {
            return Err(conflict());
        }

        let mut updated = entity.clone();
        updated.set_version(entity.version() + 1);
        *stored = updated.clone();
        Ok(updated)
    }

    fn remove(&mut self, id: i32) -> Result<T> {
        self.rows
            .remove(&id)
            .ok_or_else(|| HotelError::not_found(T::NAME, id))
    }
}

type Shared<T> = Arc<RwLock<Table<T>>>;

/// Backing tables shared by the in-memory repositories
#[derive(Clone, Default)]
pub struct InMemoryDatabase {
    countries: Shared<Country>,
    hotels: Shared<Hotel>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Database pre-populated with the reference countries
    pub fn seeded() -> Self {
        let mut countries = Table::default();
        for country in Country::reference_data() {
            countries.insert(country);
        }

        Self {
            countries: Arc::new(RwLock::new(countries)),
            hotels: Shared::default(),
        }
    }

    pub fn countries(&self) -> InMemoryCountriesRepository {
        InMemoryCountriesRepository {
            inner: InMemoryRepository::from_table(self.countries.clone()),
            hotels: self.hotels.clone(),
        }
    }

    pub fn hotels(&self) -> InMemoryHotelsRepository {
        InMemoryHotelsRepository {
            inner: InMemoryRepository::from_table(self.hotels.clone()),
            countries: self.countries.clone(),
        }
    }
}

/// Generic repository over a single in-memory table
pub struct InMemoryRepository<T> {
    table: Shared<T>,
}

impl<T> Clone for InMemoryRepository<T> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
        }
    }
}

impl<T: Entity> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> InMemoryRepository<T> {
    pub fn new() -> Self {
        Self::from_table(Shared::default())
    }

    fn from_table(table: Shared<T>) -> Self {
        Self { table }
    }
}

#[async_trait]
impl<T: Entity> GenericRepository<T> for InMemoryRepository<T> {
    async fn get(&self, id: Option<i32>) -> Result<Option<T>> {
        let Some(id) = id else {
            return Ok(None);
        };
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<T>> {
        Ok(self.table.read().await.rows.values().cloned().collect())
    }

    async fn get_paged(&self, params: &QueryParameters) -> Result<PagedResult<T>> {
        let rows = self.get_all().await?;
        paginate(rows, params)
    }

    async fn add(&self, entity: T) -> Result<T> {
        let added = self.table.write().await.insert(entity);
        debug!(entity = T::NAME, id = added.id(), "Row added");
        Ok(added)
    }

    async fn update(&self, entity: &T) -> Result<T> {
        let updated = self.table.write().await.replace(entity)?;
        debug!(entity = T::NAME, id = updated.id(), version = updated.version(), "Row updated");
        Ok(updated)
    }

    async fn delete(&self, id: i32) -> Result<()> {
        self.table.write().await.remove(id)?;
        debug!(entity = T::NAME, id, "Row deleted");
        Ok(())
    }
}

/// Countries over the shared tables; deleting a country drops its hotels
#[derive(Clone)]
pub struct InMemoryCountriesRepository {
    inner: InMemoryRepository<Country>,
    hotels: Shared<Hotel>,
}

#[async_trait]
impl GenericRepository<Country> for InMemoryCountriesRepository {
    async fn get(&self, id: Option<i32>) -> Result<Option<Country>> {
        self.inner.get(id).await
    }

    async fn get_all(&self) -> Result<Vec<Country>> {
        self.inner.get_all().await
    }

    async fn get_paged(&self, params: &QueryParameters) -> Result<PagedResult<Country>> {
        self.inner.get_paged(params).await
    }

    async fn add(&self, entity: Country) -> Result<Country> {
        self.inner.add(entity).await
    }

    async fn update(&self, entity: &Country) -> Result<Country> {
        self.inner.update(entity).await
    }

    async fn delete(&self, id: i32) -> Result<()> {
        let mut countries = self.inner.table.write().await;
        let mut hotels = self.hotels.write().await;

        countries.remove(id)?;
        let before = hotels.rows.len();
        hotels.rows.retain(|_, hotel| hotel.country_id != id);

        debug!(id, hotels_removed = before - hotels.rows.len(), "Country deleted");
        Ok(())
    }
}

#[async_trait]
impl CountriesRepository for InMemoryCountriesRepository {
    async fn get_details(&self, id: i32) -> Result<Option<CountryDetails>> {
        let countries = self.inner.table.read().await;
        let Some(country) = countries.rows.get(&id).cloned() else {
            return Ok(None);
        };

        let hotels = self
            .hotels
            .read()
            .await
            .rows
            .values()
            .filter(|hotel| hotel.country_id == id)
            .cloned()
            .collect();

        Ok(Some(CountryDetails { country, hotels }))
    }
}

/// Hotels over the shared tables; writes must reference an existing country
#[derive(Clone)]
pub struct InMemoryHotelsRepository {
    inner: InMemoryRepository<Hotel>,
    countries: Shared<Country>,
}

fn unknown_country(country_id: i32) -> HotelError {
    HotelError::Validation(format!("Country ({country_id}) does not exist"))
}

#[async_trait]
impl GenericRepository<Hotel> for InMemoryHotelsRepository {
    async fn get(&self, id: Option<i32>) -> Result<Option<Hotel>> {
        self.inner.get(id).await
    }

    async fn get_all(&self) -> Result<Vec<Hotel>> {
        self.inner.get_all().await
    }

    async fn get_paged(&self, params: &QueryParameters) -> Result<PagedResult<Hotel>> {
        self.inner.get_paged(params).await
    }

    async fn add(&self, entity: Hotel) -> Result<Hotel> {
        let countries = self.countries.read().await;
        if !countries.rows.contains_key(&entity.country_id) {
            return Err(unknown_country(entity.country_id));
        }
        let added = self.inner.table.write().await.insert(entity);
        debug!(entity = Hotel::NAME, id = added.id, "Row added");
        Ok(added)
    }

    async fn update(&self, entity: &Hotel) -> Result<Hotel> {
        let countries = self.countries.read().await;
        if !countries.rows.contains_key(&entity.country_id) {
            return Err(unknown_country(entity.country_id));
        }
        let updated = self.inner.table.write().await.replace(entity)?;
        debug!(entity = Hotel::NAME, id = updated.id, version = updated.version, "Row updated");
        Ok(updated)
    }

    async fn delete(&self, id: i32) -> Result<()> {
        self.inner.delete(id).await
    }
}

#[async_trait]
impl HotelsRepository for InMemoryHotelsRepository {
    async fn get_by_country(&self, country_id: i32) -> Result<Vec<Hotel>> {
        Ok(self
            .inner
            .table
            .read()
            .await
            .rows
            .values()
            .filter(|hotel| hotel.country_id == country_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_assigns_monotonic_ids() {
        let repo = InMemoryRepository::<Country>::new();
        let a = repo.add(Country::new("A", None)).await.unwrap();
        let b = repo.add(Country::new("B", None)).await.unwrap();
        repo.delete(b.id).await.unwrap();
        let c = repo.add(Country::new("C", None)).await.unwrap();

        assert_eq!((a.id, b.id, c.id), (1, 2, 3));
        assert_eq!(c.version, INITIAL_VERSION);
    }

    #[test]
    fn test_seeded_reference_countries() {
        let db = InMemoryDatabase::seeded();
        let countries = tokio_test::block_on(db.countries().get_all()).unwrap();

        let names: Vec<_> = countries.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Jamaica", "Bahamas", "Cayman Island"]);
        assert_eq!(countries[0].id, 1);
    }

    #[tokio::test]
    async fn test_get_none_id_is_none() {
        let db = InMemoryDatabase::seeded();
        assert!(db.countries().get(None).await.unwrap().is_none());
        assert!(db.hotels().get(None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_exists_agrees_with_get() {
        let db = InMemoryDatabase::seeded();
        let countries = db.countries();

        assert!(countries.exists(1).await.unwrap());
        assert!(!countries.exists(999).await.unwrap());

        countries.delete(1).await.unwrap();
        assert!(!countries.exists(1).await.unwrap());
        assert!(countries.get(Some(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let db = InMemoryDatabase::new();
        let err = db.hotels().delete(42).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_stale_version_conflicts() {
        let db = InMemoryDatabase::seeded();
        let countries = db.countries();
        let original = countries.get(Some(1)).await.unwrap().unwrap();

        let mut first = original.clone();
        first.name = "Jamaica (first)".to_string();
        let committed = countries.update(&first).await.unwrap();
        assert_eq!(committed.version, original.version + 1);

        let mut second = original;
        second.name = "Jamaica (second)".to_string();
        let err = countries.update(&second).await.unwrap_err();
        assert!(err.is_concurrency());

        let stored = countries.get(Some(1)).await.unwrap().unwrap();
        assert_eq!(stored.name, "Jamaica (first)");
    }

    #[tokio::test]
    async fn test_update_deleted_row_conflicts() {
        let db = InMemoryDatabase::seeded();
        let countries = db.countries();
        let country = countries.get(Some(2)).await.unwrap().unwrap();
        countries.delete(2).await.unwrap();

        let err = countries.update(&country).await.unwrap_err();
        assert!(err.is_concurrency());
    }

    #[tokio::test]
    async fn test_hotel_requires_existing_country() {
        let db = InMemoryDatabase::seeded();
        let err = db
            .hotels()
            .add(Hotel::new("Nowhere Inn", "?", 1.0, 99))
            .await
            .unwrap_err();
        assert!(matches!(err, HotelError::Validation(_)));
    }

    #[tokio::test]
    async fn test_country_delete_cascades_to_hotels() {
        let db = InMemoryDatabase::seeded();
        let hotels = db.hotels();
        hotels.add(Hotel::new("Sandals", "Negril", 4.5, 1)).await.unwrap();
        hotels.add(Hotel::new("Comfort Suites", "George Town", 4.3, 3)).await.unwrap();

        let details = db.countries().get_details(1).await.unwrap().unwrap();
        assert_eq!(details.hotels.len(), 1);

        db.countries().delete(1).await.unwrap();

        let remaining = hotels.get_all().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].country_id, 3);
        assert!(hotels.get_by_country(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_paged_thirty_rows() {
        let repo = InMemoryRepository::<Country>::new();
        for i in 0..30 {
            repo.add(Country::new(format!("Country {i}"), None)).await.unwrap();
        }

        let page = repo.get_paged(&QueryParameters::page(2, 25)).await.unwrap();
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.total_count, 30);
    }
}
