//! Domain entities stored by the generic repository

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Initial value of the optimistic concurrency token
pub const INITIAL_VERSION: i32 = 1;

/// A row with integer identity and an optimistic concurrency token
///
/// Implemented by every type the generic repository manages. `SORTABLE` lists
/// the camelCase field names accepted by `orderBy`.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Name used in error messages and logs
    const NAME: &'static str;

    /// Fields that `compare_by` understands
    const SORTABLE: &'static [&'static str];

    fn id(&self) -> i32;

    fn set_id(&mut self, id: i32);

    fn version(&self) -> i32;

    fn set_version(&mut self, version: i32);

    /// The text that `search` matches against
    fn search_text(&self) -> &str;

    /// Case-insensitive substring match on `search_text`
    fn matches(&self, term: &str) -> bool {
        self.search_text()
            .to_lowercase()
            .contains(&term.to_lowercase())
    }

    /// Compare two rows on a sortable field; `None` for unknown fields
    fn compare_by(&self, other: &Self, field: &str) -> Option<Ordering>;

    /// Canonical spelling of a sortable field, matched case-insensitively
    fn sortable_field(field: &str) -> Option<&'static str> {
        Self::SORTABLE
            .iter()
            .copied()
            .find(|candidate| candidate.eq_ignore_ascii_case(field))
    }
}

/// A country that owns zero or more hotels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Country {
    pub id: i32,
    pub name: String,
    pub short_name: Option<String>,
    pub version: i32,
}

impl Country {
    /// A country that has not been persisted yet
    pub fn new(name: impl Into<String>, short_name: Option<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            short_name,
            version: INITIAL_VERSION,
        }
    }

    /// Reference data seeded into empty stores
    pub fn reference_data() -> Vec<Country> {
        vec![
            Country::new("Jamaica", Some("JM".to_string())),
            Country::new("Bahamas", Some("BS".to_string())),
            Country::new("Cayman Island", Some("CI".to_string())),
        ]
    }
}

impl Entity for Country {
    const NAME: &'static str = "Country";
    const SORTABLE: &'static [&'static str] = &["id", "name", "shortName"];

    fn id(&self) -> i32 {
        self.id
    }

    fn set_id(&mut self, id: i32) {
        self.id = id;
    }

    fn version(&self) -> i32 {
        self.version
    }

    fn set_version(&mut self, version: i32) {
        self.version = version;
    }

    fn search_text(&self) -> &str {
        &self.name
    }

    fn compare_by(&self, other: &Self, field: &str) -> Option<Ordering> {
        match Self::sortable_field(field)? {
            "id" => Some(self.id.cmp(&other.id)),
            "name" => Some(self.name.to_lowercase().cmp(&other.name.to_lowercase())),
            "shortName" => Some(self.short_name.cmp(&other.short_name)),
            _ => None,
        }
    }
}

/// A hotel located in a country
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotel {
    pub id: i32,
    pub name: String,
    pub address: String,
    pub rating: f64,
    pub country_id: i32,
    pub version: i32,
}

impl Hotel {
    pub fn new(name: impl Into<String>, address: impl Into<String>, rating: f64, country_id: i32) -> Self {
        Self {
            id: 0,
            name: name.into(),
            address: address.into(),
            rating,
            country_id,
            version: INITIAL_VERSION,
        }
    }
}

impl Entity for Hotel {
    const NAME: &'static str = "Hotel";
    const SORTABLE: &'static [&'static str] = &["id", "name", "address", "rating", "countryId"];

    fn id(&self) -> i32 {
        self.id
    }

    fn set_id(&mut self, id: i32) {
        self.id = id;
    }

    fn version(&self) -> i32 {
        self.version
    }

    fn set_version(&mut self, version: i32) {
        self.version = version;
    }

    fn search_text(&self) -> &str {
        &self.name
    }

    fn compare_by(&self, other: &Self, field: &str) -> Option<Ordering> {
        match Self::sortable_field(field)? {
            "id" => Some(self.id.cmp(&other.id)),
            "name" => Some(self.name.to_lowercase().cmp(&other.name.to_lowercase())),
            "address" => Some(self.address.to_lowercase().cmp(&other.address.to_lowercase())),
            "rating" => Some(self.rating.total_cmp(&other.rating)),
            "countryId" => Some(self.country_id.cmp(&other.country_id)),
            _ => None,
        }
    }
}

/// A country with its hotels loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryDetails {
    #[serde(flatten)]
    pub country: Country,
    pub hotels: Vec<Hotel>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_is_case_insensitive() {
        let country = Country::new("Cayman Island", Some("CI".to_string()));
        assert!(country.matches("cayman"));
        assert!(country.matches("ISLAND"));
        assert!(!country.matches("jamaica"));
    }

    #[test]
    fn test_sortable_field_lookup() {
        assert_eq!(Hotel::sortable_field("COUNTRYID"), Some("countryId"));
        assert_eq!(Country::sortable_field("shortname"), Some("shortName"));
        assert_eq!(Country::sortable_field("rating"), None);
    }

    #[test]
    fn test_compare_by_rating() {
        let a = Hotel::new("A", "1 Road", 3.5, 1);
        let b = Hotel::new("B", "2 Road", 4.5, 1);
        assert_eq!(a.compare_by(&b, "rating"), Some(Ordering::Less));
        assert_eq!(a.compare_by(&b, "stars"), None);
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let hotel = Hotel::new("Sandals", "Montego Bay", 4.0, 1);
        let json = serde_json::to_value(&hotel).unwrap();
        assert!(json.get("countryId").is_some());
        assert!(json.get("country_id").is_none());
    }

    #[test]
    fn test_reference_data() {
        let countries = Country::reference_data();
        let codes: Vec<_> = countries
            .iter()
            .filter_map(|c| c.short_name.as_deref())
            .collect();
        assert_eq!(codes, vec!["JM", "BS", "CI"]);
        assert!(countries.iter().all(|c| c.version == INITIAL_VERSION));
    }
}
