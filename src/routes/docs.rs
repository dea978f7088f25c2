use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{services::documentation::ApiDoc, state::SharedState};

/// Swagger UI location.
pub const DOCS_PATH: &str = "/docs";
/// Raw OpenAPI document, also consumed by transport code generators.
pub const OPENAPI_PATH: &str = "/api-doc/openapi.json";

/// Serve the Swagger UI and the OpenAPI document describing the leaderboard API.
pub fn router(state: SharedState) -> Router<SharedState> {
    let ui: Router<SharedState> = SwaggerUi::new(DOCS_PATH)
        .url(OPENAPI_PATH, ApiDoc::openapi())
        .into();

    ui.with_state(state)
}
