//! OpenAPI document for the REST API
//!
//! Served as JSON at `/api-docs/openapi.json`. Write endpoints reference the
//! `bearer_auth` scheme registered by [`SecurityAddon`].

use crate::auth::{ApiUserDto, AuthResponse, IdentityError, LoginDto};
use crate::dto::{
    CountryDto, CreateCountryDto, CreateHotelDto, GetCountryDto, HotelDto, PagedCountries,
    PagedHotels, UpdateCountryDto,
};
use crate::error::ApiError;
use crate::handlers::health::{
    BuildInfo, HealthResponse, MetricsResponse, ReadinessChecks, ReadinessResponse,
};
use axum::Json;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Registers the JWT bearer scheme
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Hotel Listing API",
        description = "Countries and hotels with JWT-protected writes."
    ),
    paths(
        crate::handlers::account::register,
        crate::handlers::account::login,
        crate::handlers::account::refresh_token,
        crate::handlers::countries::get_countries,
        crate::handlers::countries::get_paged_countries,
        crate::handlers::countries::get_country,
        crate::handlers::countries::get_country_hotels,
        crate::handlers::countries::put_country,
        crate::handlers::countries::post_country,
        crate::handlers::countries::delete_country,
        crate::handlers::hotels::get_hotels,
        crate::handlers::hotels::get_paged_hotels,
        crate::handlers::hotels::get_hotel,
        crate::handlers::hotels::put_hotel,
        crate::handlers::hotels::post_hotel,
        crate::handlers::hotels::delete_hotel,
        crate::handlers::health::health_check,
        crate::handlers::health::readiness_check,
        crate::handlers::health::metrics,
    ),
    components(schemas(
        GetCountryDto,
        CountryDto,
        CreateCountryDto,
        UpdateCountryDto,
        HotelDto,
        CreateHotelDto,
        PagedCountries,
        PagedHotels,
        ApiUserDto,
        LoginDto,
        AuthResponse,
        IdentityError,
        ApiError,
        HealthResponse,
        BuildInfo,
        ReadinessResponse,
        ReadinessChecks,
        MetricsResponse,
    )),
    tags(
        (name = "account", description = "Registration, login and token refresh"),
        (name = "countries", description = "Country listings"),
        (name = "hotels", description = "Hotel listings"),
        (name = "health", description = "Liveness, readiness and counters")
    )
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_scheme_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components present");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }

    #[test]
    fn test_write_paths_documented() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/countries/{id}"));
        assert!(doc.paths.paths.contains_key("/api/v1/countries/{id}/hotels"));
        assert!(doc.paths.paths.contains_key("/api/v1/hotels"));
        assert!(doc.paths.paths.contains_key("/api/v1/account/refreshtoken"));
    }
}
