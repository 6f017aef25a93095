//! PostgreSQL repository backend
//!
//! Generic CRUD over any entity that describes its table through `PgEntity`.
//! Optimistic concurrency is enforced in the `UPDATE ... WHERE version = $n`
//! statement; cascades and foreign keys are left to the schema in
//! `migrations/`.

use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::query::QueryAs;
use sqlx::{FromRow, Postgres};
use std::marker::PhantomData;
use tracing::debug;

use crate::config::DatabaseConfig;
use crate::models::{Country, CountryDetails, Entity, Hotel};
use crate::paging::{PagedResult, QueryParameters, SortDirection};
use crate::repository::{CountriesRepository, GenericRepository, HotelsRepository};
use crate::{HotelError, Result};

const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Open a connection pool for the configured database
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool> {
    let url = config
        .url
        .as_deref()
        .ok_or_else(|| HotelError::Config("DATABASE_URL is not set".to_string()))?;

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(url)
        .await
        .map_err(|e| HotelError::Database(format!("PostgreSQL connection failed: {e}")))
}

type EntityQuery<'q, T> = QueryAs<'q, Postgres, <T as PgEntity>::Row, PgArguments>;

/// Table mapping for an entity stored in PostgreSQL
pub trait PgEntity: Entity {
    type Row: for<'r> FromRow<'r, PgRow> + Send + Unpin + Into<Self>;

    const TABLE: &'static str;

    /// Writable columns in bind order, excluding `id` and `version`
    const COLUMNS: &'static [&'static str];

    /// Column matched by `search`
    const SEARCH_COLUMN: &'static str = "name";

    /// Column backing a canonical sortable field
    fn sort_column(field: &str) -> Option<&'static str>;

    /// Bind `COLUMNS` in order
    fn bind_columns<'q>(&self, query: EntityQuery<'q, Self>) -> EntityQuery<'q, Self>;
}

#[derive(Debug, FromRow)]
pub struct CountryRow {
    id: i32,
    name: String,
    short_name: Option<String>,
    version: i32,
}

impl From<CountryRow> for Country {
    fn from(row: CountryRow) -> Self {
        Country {
            id: row.id,
            name: row.name,
            short_name: row.short_name,
            version: row.version,
        }
    }
}

impl PgEntity for Country {
    type Row = CountryRow;

    const TABLE: &'static str = "countries";
    const COLUMNS: &'static [&'static str] = &["name", "short_name"];

    fn sort_column(field: &str) -> Option<&'static str> {
        match field {
            "id" => Some("id"),
            "name" => Some("name"),
            "shortName" => Some("short_name"),
            _ => None,
        }
    }

    fn bind_columns<'q>(&self, query: EntityQuery<'q, Self>) -> EntityQuery<'q, Self> {
        query.bind(self.name.clone()).bind(self.short_name.clone())
    }
}

#[derive(Debug, FromRow)]
pub struct HotelRow {
    id: i32,
    name: String,
    address: String,
    rating: f64,
    country_id: i32,
    version: i32,
}

impl From<HotelRow> for Hotel {
    fn from(row: HotelRow) -> Self {
        Hotel {
            id: row.id,
            name: row.name,
            address: row.address,
            rating: row.rating,
            country_id: row.country_id,
            version: row.version,
        }
    }
}

impl PgEntity for Hotel {
    type Row = HotelRow;

    const TABLE: &'static str = "hotels";
    const COLUMNS: &'static [&'static str] = &["name", "address", "rating", "country_id"];

    fn sort_column(field: &str) -> Option<&'static str> {
        match field {
            "id" => Some("id"),
            "name" => Some("name"),
            "address" => Some("address"),
            "rating" => Some("rating"),
            "countryId" => Some("country_id"),
            _ => None,
        }
    }

    fn bind_columns<'q>(&self, query: EntityQuery<'q, Self>) -> EntityQuery<'q, Self> {
        query
            .bind(self.name.clone())
            .bind(self.address.clone())
            .bind(self.rating)
            .bind(self.country_id)
    }
}

fn select_list<T: PgEntity>() -> String {
    format!("id, {}, version", T::COLUMNS.join(", "))
}

fn insert_sql<T: PgEntity>() -> String {
    let placeholders: Vec<String> = (1..=T::COLUMNS.len()).map(|i| format!("${i}")).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        T::TABLE,
        T::COLUMNS.join(", "),
        placeholders.join(", "),
        select_list::<T>()
    )
}

fn update_sql<T: PgEntity>() -> String {
    let assignments: Vec<String> = T::COLUMNS
        .iter()
        .enumerate()
        .map(|(i, column)| format!("{column} = ${}", i + 1))
        .collect();
    let n = T::COLUMNS.len();
    format!(
        "UPDATE {} SET {}, version = version + 1 WHERE id = ${} AND version = ${} RETURNING {}",
        T::TABLE,
        assignments.join(", "),
        n + 1,
        n + 2,
        select_list::<T>()
    )
}

/// Escape `%`, `_` and `\` so user input matches literally inside `ILIKE`
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn map_db_error<T: Entity>(action: &str, err: sqlx::Error) -> HotelError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) {
            return HotelError::Validation(format!(
                "{} references a row that does not exist",
                T::NAME
            ));
        }
    }
    HotelError::Database(format!("Failed to {action} {}: {err}", T::NAME))
}

/// Generic repository over one PostgreSQL table
pub struct PgRepository<T> {
    pool: PgPool,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for PgRepository<T> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: PgEntity> PgRepository<T> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl<T: PgEntity> GenericRepository<T> for PgRepository<T> {
    async fn get(&self, id: Option<i32>) -> Result<Option<T>> {
        let Some(id) = id else {
            return Ok(None);
        };

        let sql = format!("SELECT {} FROM {} WHERE id = $1", select_list::<T>(), T::TABLE);
        let row = sqlx::query_as::<_, T::Row>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error::<T>("get", e))?;

        Ok(row.map(Into::into))
    }

    async fn get_all(&self) -> Result<Vec<T>> {
        let sql = format!("SELECT {} FROM {} ORDER BY id", select_list::<T>(), T::TABLE);
        let rows = sqlx::query_as::<_, T::Row>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error::<T>("list", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_paged(&self, params: &QueryParameters) -> Result<PagedResult<T>> {
        let order = match params.sort_order::<T>()? {
            Some(order) => {
                let column = T::sort_column(order.field).ok_or_else(|| {
                    HotelError::Validation(format!("Cannot order {} by '{}'", T::NAME, order.field))
                })?;
                let direction = match order.direction {
                    SortDirection::Asc => "ASC",
                    SortDirection::Desc => "DESC",
                };
                format!("{column} {direction}, id")
            }
            None => "id".to_string(),
        };

        let pattern = params.search_term().map(like_pattern);
        let (filter, first_paging_param) = match pattern {
            Some(_) => (format!("WHERE {} ILIKE $1", T::SEARCH_COLUMN), 2),
            None => (String::new(), 1),
        };

        let count_sql = format!("SELECT COUNT(*) FROM {} {filter}", T::TABLE);
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(pattern) = &pattern {
            count_query = count_query.bind(pattern.clone());
        }
        let total_count = count_query
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error::<T>("count", e))?;

        let page_sql = format!(
            "SELECT {} FROM {} {filter} ORDER BY {order} LIMIT ${} OFFSET ${}",
            select_list::<T>(),
            T::TABLE,
            first_paging_param,
            first_paging_param + 1
        );
        let mut page_query = sqlx::query_as::<_, T::Row>(&page_sql);
        if let Some(pattern) = &pattern {
            page_query = page_query.bind(pattern.clone());
        }
        let rows = page_query
            .bind(i64::from(params.effective_page_size()))
            .bind(i64::try_from(params.skip()).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error::<T>("page", e))?;

        let items = rows.into_iter().map(Into::into).collect();
        Ok(PagedResult::new(
            items,
            u64::try_from(total_count).unwrap_or_default(),
            params,
        ))
    }

    async fn add(&self, entity: T) -> Result<T> {
        let sql = insert_sql::<T>();
        let row = entity
            .bind_columns(sqlx::query_as::<_, T::Row>(&sql))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error::<T>("add", e))?;

        let added: T = row.into();
        debug!(entity = T::NAME, id = added.id(), "Row added");
        Ok(added)
    }

    async fn update(&self, entity: &T) -> Result<T> {
        let sql = update_sql::<T>();
        let row = entity
            .bind_columns(sqlx::query_as::<_, T::Row>(&sql))
            .bind(entity.id())
            .bind(entity.version())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error::<T>("update", e))?;

        let updated: T = row.map(Into::into).ok_or(HotelError::Concurrency {
            entity: T::NAME,
            id: entity.id(),
        })?;
        debug!(entity = T::NAME, id = updated.id(), version = updated.version(), "Row updated");
        Ok(updated)
    }

    async fn delete(&self, id: i32) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE id = $1", T::TABLE);
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_db_error::<T>("delete", e))?;

        if result.rows_affected() == 0 {
            return Err(HotelError::not_found(T::NAME, id));
        }
        debug!(entity = T::NAME, id, "Row deleted");
        Ok(())
    }
}

async fn hotels_in_country(pool: &PgPool, country_id: i32) -> Result<Vec<Hotel>> {
    let sql = format!(
        "SELECT {} FROM hotels WHERE country_id = $1 ORDER BY id",
        select_list::<Hotel>()
    );
    let rows = sqlx::query_as::<_, HotelRow>(&sql)
        .bind(country_id)
        .fetch_all(pool)
        .await
        .map_err(|e| map_db_error::<Hotel>("list", e))?;

    Ok(rows.into_iter().map(Into::into).collect())
}

/// Countries backed by PostgreSQL
#[derive(Clone)]
pub struct PgCountriesRepository {
    inner: PgRepository<Country>,
}

impl PgCountriesRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            inner: PgRepository::new(pool),
        }
    }
}

#[async_trait]
impl GenericRepository<Country> for PgCountriesRepository {
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
        self.inner.delete(id).await
    }
}

#[async_trait]
impl CountriesRepository for PgCountriesRepository {
    async fn get_details(&self, id: i32) -> Result<Option<CountryDetails>> {
        let Some(country) = self.inner.get(Some(id)).await? else {
            return Ok(None);
        };
        let hotels = hotels_in_country(self.inner.pool(), id).await?;
        Ok(Some(CountryDetails { country, hotels }))
    }
}

/// Hotels backed by PostgreSQL
#[derive(Clone)]
pub struct PgHotelsRepository {
    inner: PgRepository<Hotel>,
}

impl PgHotelsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            inner: PgRepository::new(pool),
        }
    }
}

#[async_trait]
impl GenericRepository<Hotel> for PgHotelsRepository {
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
        self.inner.add(entity).await
    }

    async fn update(&self, entity: &Hotel) -> Result<Hotel> {
        self.inner.update(entity).await
    }

    async fn delete(&self, id: i32) -> Result<()> {
        self.inner.delete(id).await
    }
}

#[async_trait]
impl HotelsRepository for PgHotelsRepository {
    async fn get_by_country(&self, country_id: i32) -> Result<Vec<Hotel>> {
        hotels_in_country(self.inner.pool(), country_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_sql() {
        assert_eq!(
            insert_sql::<Country>(),
            "INSERT INTO countries (name, short_name) VALUES ($1, $2) \
             RETURNING id, name, short_name, version"
        );
    }

    #[test]
    fn test_update_sql_guards_version() {
        let sql = update_sql::<Hotel>();
        assert!(sql.starts_with(
            "UPDATE hotels SET name = $1, address = $2, rating = $3, country_id = $4, version = version + 1"
        ));
        assert!(sql.contains("WHERE id = $5 AND version = $6"));
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("plain"), "%plain%");
    }

    #[test]
    fn test_every_sortable_field_has_a_column() {
        for field in Country::SORTABLE {
            assert!(Country::sort_column(field).is_some(), "{field}");
        }
        for field in Hotel::SORTABLE {
            assert!(Hotel::sort_column(field).is_some(), "{field}");
        }
    }

    async fn test_pool() -> Option<PgPool> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let config = DatabaseConfig {
            url: Some(url),
            max_connections: 2,
        };
        connect(&config).await.ok()
    }

    #[tokio::test]
    #[ignore = "requires a migrated PostgreSQL database in DATABASE_URL"]
    async fn test_pg_country_roundtrip_and_conflict() {
        let Some(pool) = test_pool().await else {
            return;
        };
        let repo = PgCountriesRepository::new(pool);

        let added = repo
            .add(Country::new("Test Country", Some("TC".to_string())))
            .await
            .unwrap();
        assert_eq!(added.version, 1);

        let mut renamed = added.clone();
        renamed.name = "Renamed".to_string();
        let updated = repo.update(&renamed).await.unwrap();
        assert_eq!(updated.version, 2);

        let err = repo.update(&renamed).await.unwrap_err();
        assert!(err.is_concurrency());

        repo.delete(added.id).await.unwrap();
        assert!(!repo.exists(added.id).await.unwrap());
        assert!(repo.delete(added.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    #[ignore = "requires a migrated PostgreSQL database in DATABASE_URL"]
    async fn test_pg_hotel_requires_country() {
        let Some(pool) = test_pool().await else {
            return;
        };
        let repo = PgHotelsRepository::new(pool);
        let err = repo
            .add(Hotel::new("Ghost", "Nowhere", 1.0, i32::MAX))
            .await
            .unwrap_err();
        assert!(matches!(err, HotelError::Validation(_)));
    }
}
