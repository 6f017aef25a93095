//! API route definitions

use crate::auth::middleware::auth_middleware;
use crate::handlers::{account, countries, hotels};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

/// Mount point of the versioned API
pub const API_PREFIX: &str = "/api/v1";

/// Create API v1 routes
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/account/register", post(account::register))
        .route("/account/login", post(account::login))
        .route("/account/refreshtoken", post(account::refresh_token))
        .route("/countries/all", get(countries::get_countries))
        .route("/countries", get(countries::get_paged_countries))
        .route("/countries/:id", get(countries::get_country))
        .route("/countries/:id/hotels", get(countries::get_country_hotels))
        .route("/hotels/all", get(hotels::get_hotels))
        .route("/hotels", get(hotels::get_paged_hotels))
        .route("/hotels/:id", get(hotels::get_hotel));

    // Protected routes (bearer token required)
    let protected_routes = Router::new()
        .route("/countries", post(countries::post_country))
        .route(
            "/countries/:id",
            put(countries::put_country).delete(countries::delete_country),
        )
        .route("/hotels", post(hotels::post_hotel))
        .route(
            "/hotels/:id",
            put(hotels::put_hotel).delete(hotels::delete_hotel),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new().merge(public_routes).merge(protected_routes)
}
