//! Request and response bodies for the listing endpoints
//!
//! Entities never leave the crate boundary directly: reads project them into
//! these shapes and writes map these shapes onto an entity, so the
//! concurrency token stays server side.

use hotel_core::{Country, CountryDetails, Hotel};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Country without its hotels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetCountryDto {
    pub id: i32,
    pub name: String,
    pub short_name: Option<String>,
}

impl From<Country> for GetCountryDto {
    fn from(country: Country) -> Self {
        Self {
            id: country.id,
            name: country.name,
            short_name: country.short_name,
        }
    }
}

/// Country with its hotels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CountryDto {
    pub id: i32,
    pub name: String,
    pub short_name: Option<String>,
    pub hotels: Vec<HotelDto>,
}

impl From<CountryDetails> for CountryDto {
    fn from(details: CountryDetails) -> Self {
        Self {
            id: details.country.id,
            name: details.country.name,
            short_name: details.country.short_name,
            hotels: details.hotels.into_iter().map(HotelDto::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCountryDto {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub short_name: Option<String>,
}

impl From<CreateCountryDto> for Country {
    fn from(dto: CreateCountryDto) -> Self {
        Country::new(dto.name, dto.short_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCountryDto {
    pub id: i32,
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub short_name: Option<String>,
}

impl UpdateCountryDto {
    /// Copy the editable fields onto a loaded row, keeping its id and version
    pub fn apply(self, country: &mut Country) {
        country.name = self.name;
        country.short_name = self.short_name;
    }
}

/// Hotel as read and as replaced by PUT
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HotelDto {
    pub id: i32,
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
    pub rating: f64,
    pub country_id: i32,
}

impl From<Hotel> for HotelDto {
    fn from(hotel: Hotel) -> Self {
        Self {
            id: hotel.id,
            name: hotel.name,
            address: hotel.address,
            rating: hotel.rating,
            country_id: hotel.country_id,
        }
    }
}

impl HotelDto {
    pub fn apply(self, hotel: &mut Hotel) {
        hotel.name = self.name;
        hotel.address = self.address;
        hotel.rating = self.rating;
        hotel.country_id = self.country_id;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateHotelDto {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
    pub rating: f64,
    pub country_id: i32,
}

impl From<CreateHotelDto> for Hotel {
    fn from(dto: CreateHotelDto) -> Self {
        Hotel::new(dto.name, dto.address, dto.rating, dto.country_id)
    }
}

/// One page of countries (OpenAPI schema only)
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PagedCountries {
    items: Vec<GetCountryDto>,
    total_count: u64,
    page_number: u32,
    page_size: u32,
}

/// One page of hotels (OpenAPI schema only)
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PagedHotels {
    items: Vec<HotelDto>,
    total_count: u64,
    page_number: u32,
    page_size: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_keeps_identity_and_version() {
        let mut country = Country::new("Jamaica", Some("JM".to_string()));
        country.id = 1;
        country.version = 4;

        UpdateCountryDto {
            id: 1,
            name: "Jamaica West Indies".to_string(),
            short_name: None,
        }
        .apply(&mut country);

        assert_eq!(country.id, 1);
        assert_eq!(country.version, 4);
        assert_eq!(country.name, "Jamaica West Indies");
        assert_eq!(country.short_name, None);
    }

    #[test]
    fn test_country_dto_nests_hotels() {
        let mut country = Country::new("Bahamas", Some("BS".to_string()));
        country.id = 2;
        let mut hotel = Hotel::new("Grand Palladium", "Nassau", 4.0, 2);
        hotel.id = 7;

        let dto = CountryDto::from(CountryDetails {
            country,
            hotels: vec![hotel],
        });

        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["shortName"], "BS");
        assert_eq!(json["hotels"][0]["countryId"], 2);
        assert!(json.get("version").is_none());
    }

    #[test]
    fn test_create_country_requires_name() {
        let dto = CreateCountryDto {
            name: String::new(),
            short_name: None,
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_create_hotel_starts_unsaved() {
        let hotel = Hotel::from(CreateHotelDto {
            name: "Sandals Resort and Spa".to_string(),
            address: "Negril".to_string(),
            rating: 4.5,
            country_id: 1,
        });
        assert_eq!(hotel.id, 0);
        assert_eq!(hotel.version, hotel_core::models::INITIAL_VERSION);
    }
}
