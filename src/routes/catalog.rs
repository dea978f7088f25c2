use axum::{Json, Router, routing::get};

use crate::{dto::catalog::CatalogResponse, services::catalog_service, state::SharedState};

/// Option catalog routes.
pub fn router() -> Router<SharedState> {
    Router::new().route("/catalog", get(get_catalog))
}

#[utoipa::path(
    get,
    path = "/catalog",
    tag = "leaderboard",
    responses((status = 200, description = "Accepted simulators, tracks and modes", body = CatalogResponse))
)]
/// List the option sets the transport offers as buttons.
pub async fn get_catalog() -> Json<CatalogResponse> {
    Json(catalog_service::catalog())
}
