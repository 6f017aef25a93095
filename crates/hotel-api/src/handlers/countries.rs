//! Country endpoints

use super::{ensure_same_id, save_update};
use crate::auth::AuthenticatedUser;
use crate::dto::{CountryDto, CreateCountryDto, GetCountryDto, HotelDto, UpdateCountryDto};
use crate::error::AppError;
use crate::routes::API_PREFIX;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use hotel_core::{Country, HotelError, PagedResult, QueryParameters};
use std::sync::Arc;
use tracing::info;
use validator::Validate;

/// List every country
#[utoipa::path(
    get,
    path = "/api/v1/countries/all",
    tag = "countries",
    responses(
        (status = 200, description = "All countries", body = Vec<GetCountryDto>)
    )
)]
pub async fn get_countries(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<GetCountryDto>>, AppError> {
    let countries = state.countries.get_all().await?;
    Ok(Json(countries.into_iter().map(GetCountryDto::from).collect()))
}

/// One page of countries
#[utoipa::path(
    get,
    path = "/api/v1/countries",
    tag = "countries",
    params(
        ("startIndex" = Option<u32>, Query, description = "Absolute offset, overrides pageNumber"),
        ("pageNumber" = Option<u32>, Query, description = "1-based page number"),
        ("pageSize" = Option<u32>, Query, description = "Rows per page"),
        ("search" = Option<String>, Query, description = "Name filter"),
        ("orderBy" = Option<String>, Query, description = "Field, optionally followed by asc or desc")
    ),
    responses(
        (status = 200, description = "Requested page", body = crate::dto::PagedCountries),
        (status = 400, description = "Unknown sort field", body = crate::error::ApiError)
    )
)]
pub async fn get_paged_countries(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParameters>,
) -> Result<Json<PagedResult<GetCountryDto>>, AppError> {
    let page = state.countries.get_paged(&params).await?;
    Ok(Json(page.project()))
}

/// A country with its hotels
#[utoipa::path(
    get,
    path = "/api/v1/countries/{id}",
    tag = "countries",
    params(("id" = i32, Path, description = "Country id")),
    responses(
        (status = 200, description = "Country found", body = CountryDto),
        (status = 404, description = "Country not found", body = crate::error::ApiError)
    )
)]
pub async fn get_country(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<CountryDto>, AppError> {
    let details = state
        .countries
        .get_details(id)
        .await?
        .ok_or_else(|| HotelError::not_found("Country", id))?;

    Ok(Json(details.into()))
}

#[utoipa::path(
    get,
    path = "/api/v1/countries/{id}/hotels",
    tag = "countries",
    params(("id" = i32, Path, description = "Country id")),
    responses(
        (status = 200, description = "Hotels in the country", body = Vec<HotelDto>),
        (status = 404, description = "Country not found", body = crate::error::ApiError)
    )
)]
pub async fn get_country_hotels(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<HotelDto>>, AppError> {
    if !state.countries.exists(id).await? {
        return Err(HotelError::not_found("Country", id).into());
    }

    let hotels = state.hotels.get_by_country(id).await?;
    Ok(Json(hotels.into_iter().map(HotelDto::from).collect()))
}

#[utoipa::path(
    put,
    path = "/api/v1/countries/{id}",
    tag = "countries",
    params(("id" = i32, Path, description = "Country id")),
    request_body = UpdateCountryDto,
    responses(
        (status = 204, description = "Country updated"),
        (status = 400, description = "Id mismatch or invalid body", body = crate::error::ApiError),
        (status = 401, description = "Missing or invalid token", body = crate::error::ApiError),
        (status = 404, description = "Country not found", body = crate::error::ApiError),
        (status = 409, description = "Country changed concurrently", body = crate::error::ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn put_country(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
    Json(dto): Json<UpdateCountryDto>,
) -> Result<StatusCode, AppError> {
    ensure_same_id(id, dto.id)?;
    dto.validate()?;

    let mut country = state
        .countries
        .get(Some(id))
        .await?
        .ok_or_else(|| HotelError::not_found("Country", id))?;

    dto.apply(&mut country);
    save_update(state.countries.as_ref(), &country).await?;

    info!(country_id = id, user_id = %user.user_id, "Country updated");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/countries",
    tag = "countries",
    request_body = CreateCountryDto,
    responses(
        (status = 201, description = "Country created", body = GetCountryDto),
        (status = 400, description = "Invalid body", body = crate::error::ApiError),
        (status = 401, description = "Missing or invalid token", body = crate::error::ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn post_country(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(dto): Json<CreateCountryDto>,
) -> Result<impl IntoResponse, AppError> {
    dto.validate()?;

    let country = state.countries.add(Country::from(dto)).await?;
    info!(country_id = country.id, user_id = %user.user_id, "Country created");

    let location = format!("{API_PREFIX}/countries/{}", country.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(GetCountryDto::from(country)),
    ))
}

/// Delete a country and its hotels
#[utoipa::path(
    delete,
    path = "/api/v1/countries/{id}",
    tag = "countries",
    params(("id" = i32, Path, description = "Country id")),
    responses(
        (status = 204, description = "Country deleted"),
        (status = 401, description = "Missing or invalid token", body = crate::error::ApiError),
        (status = 404, description = "Country not found", body = crate::error::ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_country(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    if state.countries.get(Some(id)).await?.is_none() {
        return Err(HotelError::not_found("Country", id).into());
    }

    state.countries.delete(id).await?;
    info!(country_id = id, user_id = %user.user_id, "Country deleted");
    Ok(StatusCode::NO_CONTENT)
}
