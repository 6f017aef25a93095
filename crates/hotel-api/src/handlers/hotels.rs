//! Hotel endpoints

use super::{ensure_same_id, save_update};
use crate::auth::AuthenticatedUser;
use crate::dto::{CreateHotelDto, HotelDto};
use crate::error::AppError;
use crate::routes::API_PREFIX;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use hotel_core::{Hotel, HotelError, PagedResult, QueryParameters};
use std::sync::Arc;
use tracing::info;
use validator::Validate;

#[utoipa::path(
    get,
    path = "/api/v1/hotels/all",
    tag = "hotels",
    responses(
        (status = 200, description = "All hotels", body = Vec<HotelDto>)
    )
)]
pub async fn get_hotels(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<HotelDto>>, AppError> {
    let hotels = state.hotels.get_all().await?;
    Ok(Json(hotels.into_iter().map(HotelDto::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v1/hotels",
    tag = "hotels",
    params(
        ("startIndex" = Option<u32>, Query, description = "Absolute offset, overrides pageNumber"),
        ("pageNumber" = Option<u32>, Query, description = "1-based page number"),
        ("pageSize" = Option<u32>, Query, description = "Rows per page"),
        ("search" = Option<String>, Query, description = "Name filter"),
        ("orderBy" = Option<String>, Query, description = "Field, optionally followed by asc or desc")
    ),
    responses(
        (status = 200, description = "Requested page", body = crate::dto::PagedHotels),
        (status = 400, description = "Unknown sort field", body = crate::error::ApiError)
    )
)]
pub async fn get_paged_hotels(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParameters>,
) -> Result<Json<PagedResult<HotelDto>>, AppError> {
    let page = state.hotels.get_paged(&params).await?;
    Ok(Json(page.project()))
}

#[utoipa::path(
    get,
    path = "/api/v1/hotels/{id}",
    tag = "hotels",
    params(("id" = i32, Path, description = "Hotel id")),
    responses(
        (status = 200, description = "Hotel found", body = HotelDto),
        (status = 404, description = "Hotel not found", body = crate::error::ApiError)
    )
)]
pub async fn get_hotel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<HotelDto>, AppError> {
    let hotel = state
        .hotels
        .get(Some(id))
        .await?
        .ok_or_else(|| HotelError::not_found("Hotel", id))?;

    Ok(Json(hotel.into()))
}

#[utoipa::path(
    put,
    path = "/api/v1/hotels/{id}",
    tag = "hotels",
    params(("id" = i32, Path, description = "Hotel id")),
    request_body = HotelDto,
    responses(
        (status = 204, description = "Hotel updated"),
        (status = 400, description = "Id mismatch, invalid body or unknown country", body = crate::error::ApiError),
        (status = 401, description = "Missing or invalid token", body = crate::error::ApiError),
        (status = 404, description = "Hotel not found", body = crate::error::ApiError),
        (status = 409, description = "Hotel changed concurrently", body = crate::error::ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn put_hotel(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
    Json(dto): Json<HotelDto>,
) -> Result<StatusCode, AppError> {
    ensure_same_id(id, dto.id)?;
    dto.validate()?;

    let mut hotel = state
        .hotels
        .get(Some(id))
        .await?
        .ok_or_else(|| HotelError::not_found("Hotel", id))?;

    dto.apply(&mut hotel);
    save_update(state.hotels.as_ref(), &hotel).await?;

    info!(hotel_id = id, user_id = %user.user_id, "Hotel updated");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/hotels",
    tag = "hotels",
    request_body = CreateHotelDto,
    responses(
        (status = 201, description = "Hotel created", body = HotelDto),
        (status = 400, description = "Invalid body or unknown country", body = crate::error::ApiError),
        (status = 401, description = "Missing or invalid token", body = crate::error::ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn post_hotel(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(dto): Json<CreateHotelDto>,
) -> Result<impl IntoResponse, AppError> {
    dto.validate()?;

    let hotel = state.hotels.add(Hotel::from(dto)).await?;
    info!(hotel_id = hotel.id, user_id = %user.user_id, "Hotel created");

    let location = format!("{API_PREFIX}/hotels/{}", hotel.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(HotelDto::from(hotel)),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/hotels/{id}",
    tag = "hotels",
    params(("id" = i32, Path, description = "Hotel id")),
    responses(
        (status = 204, description = "Hotel deleted"),
        (status = 401, description = "Missing or invalid token", body = crate::error::ApiError),
        (status = 404, description = "Hotel not found", body = crate::error::ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_hotel(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    if state.hotels.get(Some(id)).await?.is_none() {
        return Err(HotelError::not_found("Hotel", id).into());
    }

    state.hotels.delete(id).await?;
    info!(hotel_id = id, user_id = %user.user_id, "Hotel deleted");
    Ok(StatusCode::NO_CONTENT)
}
