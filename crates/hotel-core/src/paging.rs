//! Paging, filtering, ordering and projection of entity sets

use crate::models::Entity;
use crate::{HotelError, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 15;

fn default_page_number() -> u32 {
    1
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

/// Query string accepted by paged list endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParameters {
    /// Absolute offset; overrides `page_number` when present
    #[serde(default)]
    pub start_index: Option<u32>,

    #[serde(default = "default_page_number")]
    pub page_number: u32,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Case-insensitive substring filter on the entity name
    #[serde(default)]
    pub search: Option<String>,

    /// `"<field>"` or `"<field> desc"`
    #[serde(default)]
    pub order_by: Option<String>,
}

impl Default for QueryParameters {
    fn default() -> Self {
        Self {
            start_index: None,
            page_number: default_page_number(),
            page_size: default_page_size(),
            search: None,
            order_by: None,
        }
    }
}

impl QueryParameters {
    pub fn page(page_number: u32, page_size: u32) -> Self {
        Self {
            page_number,
            page_size,
            ..Self::default()
        }
    }

    /// Page number with zero treated as the first page
    pub fn effective_page_number(&self) -> u32 {
        self.page_number.max(1)
    }

    /// Page size with zero replaced by the default
    pub fn effective_page_size(&self) -> u32 {
        if self.page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            self.page_size
        }
    }

    /// Number of matching rows to skip
    pub fn skip(&self) -> u64 {
        match self.start_index {
            Some(start) => u64::from(start),
            None => {
                u64::from(self.effective_page_number() - 1) * u64::from(self.effective_page_size())
            }
        }
    }

    /// Search term, ignoring blank input
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }

    /// Parsed and validated `order_by` for entity `T`
    pub fn sort_order<T: Entity>(&self) -> Result<Option<SortOrder>> {
        match self.order_by.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => SortOrder::parse::<T>(raw).map(Some),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Validated ordering over one of an entity's sortable fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOrder {
    /// Canonical camelCase field name
    pub field: &'static str,
    pub direction: SortDirection,
}

impl SortOrder {
    /// Parse `"<field>"`, `"<field> asc"` or `"<field> desc"`
    pub fn parse<T: Entity>(raw: &str) -> Result<Self> {
        let mut parts = raw.split_whitespace();
        let name = parts.next().unwrap_or_default();

        let direction = match parts.next().map(str::to_ascii_lowercase).as_deref() {
            None | Some("asc") => SortDirection::Asc,
            Some("desc") => SortDirection::Desc,
            Some(other) => {
                return Err(HotelError::Validation(format!(
                    "Unknown sort direction '{other}'"
                )))
            }
        };

        if parts.next().is_some() {
            return Err(HotelError::Validation(format!(
                "Invalid orderBy '{raw}'"
            )));
        }

        let field = T::sortable_field(name).ok_or_else(|| {
            HotelError::Validation(format!(
                "Cannot order {} by '{}'; expected one of: {}",
                T::NAME,
                name,
                T::SORTABLE.join(", ")
            ))
        })?;

        Ok(Self { field, direction })
    }
}

/// One page of results plus the unpaged match count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub page_number: u32,
    pub page_size: u32,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total_count: u64, params: &QueryParameters) -> Self {
        Self {
            items,
            total_count,
            page_number: params.effective_page_number(),
            page_size: params.effective_page_size(),
        }
    }

    /// Map every item into a result type, keeping the paging metadata
    pub fn project<R: From<T>>(self) -> PagedResult<R> {
        PagedResult {
            items: self.items.into_iter().map(R::from).collect(),
            total_count: self.total_count,
            page_number: self.page_number,
            page_size: self.page_size,
        }
    }
}

/// Filter, order and page an in-memory row set
pub fn paginate<T: Entity>(rows: Vec<T>, params: &QueryParameters) -> Result<PagedResult<T>> {
    let order = params.sort_order::<T>()?;

    let mut matching: Vec<T> = match params.search_term() {
        Some(term) => rows.into_iter().filter(|row| row.matches(term)).collect(),
        None => rows,
    };

    match order {
        Some(order) => matching.sort_by(|a, b| {
            let ordering = a
                .compare_by(b, order.field)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id().cmp(&b.id()));
            match order.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        }),
        None => matching.sort_by_key(|row| row.id()),
    }

    let total_count = matching.len() as u64;
    let skip = usize::try_from(params.skip()).unwrap_or(usize::MAX);
    let items = matching
        .into_iter()
        .skip(skip)
        .take(params.effective_page_size() as usize)
        .collect();

    Ok(PagedResult::new(items, total_count, params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Country, Hotel};
    use proptest::prelude::*;

    fn hotels(count: i32) -> Vec<Hotel> {
        (1..=count)
            .map(|i| {
                let mut hotel = Hotel::new(format!("Hotel {i:02}"), "Seaside", f64::from(i % 5), 1);
                hotel.id = i;
                hotel
            })
            .collect()
    }

    #[test]
    fn test_thirty_rows_page_size_twenty_five() {
        let first = paginate(hotels(30), &QueryParameters::page(1, 25)).unwrap();
        assert_eq!(first.items.len(), 25);
        assert_eq!(first.total_count, 30);

        let second = paginate(hotels(30), &QueryParameters::page(2, 25)).unwrap();
        assert_eq!(second.items.len(), 5);
        assert_eq!(second.items[0].id, 26);
    }

    #[test]
    fn test_start_index_overrides_page_number() {
        let params = QueryParameters {
            start_index: Some(3),
            page_number: 9,
            page_size: 2,
            ..Default::default()
        };
        let page = paginate(hotels(10), &params).unwrap();
        let ids: Vec<_> = page.items.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![4, 5]);
    }

    #[test]
    fn test_defaults() {
        let params: QueryParameters = serde_json::from_str("{}").unwrap();
        assert_eq!(params.page_number, 1);
        assert_eq!(params.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(params.skip(), 0);

        let zero = QueryParameters::page(0, 0);
        assert_eq!(zero.skip(), 0);
        assert_eq!(zero.effective_page_size(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_search_counts_before_paging() {
        let params = QueryParameters {
            search: Some("hotel 1".to_string()),
            page_size: 3,
            ..Default::default()
        };
        // Hotel 10 .. Hotel 19
        let page = paginate(hotels(30), &params).unwrap();
        assert_eq!(page.total_count, 10);
        assert_eq!(page.items.len(), 3);
    }

    #[test]
    fn test_order_by_desc() {
        let params = QueryParameters {
            order_by: Some("name desc".to_string()),
            ..Default::default()
        };
        let page = paginate(hotels(5), &params).unwrap();
        assert_eq!(page.items[0].name, "Hotel 05");
    }

    #[test]
    fn test_unknown_sort_field_rejected() {
        let params = QueryParameters {
            order_by: Some("rating".to_string()),
            ..Default::default()
        };
        let err = paginate(Country::reference_data(), &params).unwrap_err();
        assert!(matches!(err, HotelError::Validation(_)));

        assert!(SortOrder::parse::<Hotel>("rating sideways").is_err());
        assert!(SortOrder::parse::<Hotel>("rating desc extra").is_err());
    }

    #[test]
    fn test_project_keeps_metadata() {
        #[derive(Debug)]
        struct Name(String);
        impl From<Hotel> for Name {
            fn from(hotel: Hotel) -> Self {
                Name(hotel.name)
            }
        }

        let page = paginate(hotels(4), &QueryParameters::page(2, 3)).unwrap();
        let projected: PagedResult<Name> = page.project();
        assert_eq!(projected.total_count, 4);
        assert_eq!(projected.page_number, 2);
        assert_eq!(projected.items.len(), 1);
        assert_eq!(projected.items[0].0, "Hotel 04");
    }

    proptest! {
        #[test]
        fn prop_page_never_exceeds_page_size(
            rows in 0i32..80,
            page_number in 0u32..10,
            page_size in 0u32..40,
        ) {
            let params = QueryParameters::page(page_number, page_size);
            let page = paginate(hotels(rows), &params).unwrap();
            prop_assert!(page.items.len() as u32 <= params.effective_page_size());
            prop_assert_eq!(page.total_count, rows as u64);
        }

        #[test]
        fn prop_pages_cover_rows_exactly_once(rows in 0i32..60, page_size in 1u32..20) {
            let mut seen = Vec::new();
            let pages = (rows as u32).div_ceil(page_size) + 1;
            for page_number in 1..=pages {
                let page = paginate(hotels(rows), &QueryParameters::page(page_number, page_size)).unwrap();
                seen.extend(page.items.into_iter().map(|h| h.id));
            }
            let expected: Vec<i32> = (1..=rows).collect();
            prop_assert_eq!(seen, expected);
        }
    }
}
