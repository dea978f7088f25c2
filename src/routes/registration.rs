use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};

use crate::{
    dao::models::Identity,
    dto::registration::{RegisterRequest, RegistrationResponse, UserSummary},
    error::{AppError, ErrorBody},
    routes::extract::ValidJson,
    services::registration_service,
    state::SharedState,
};

/// Member registration and lookup routes.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/registrations", post(register))
        .route("/users/{identity}", get(get_user))
}

/// Register a member, or overwrite the details of an existing one.
#[utoipa::path(
    post,
    path = "/registrations",
    tag = "members",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Member stored", body = RegistrationResponse),
        (status = 400, description = "Malformed field; re-prompt the member", body = ErrorBody),
        (status = 503, description = "Storage unavailable", body = ErrorBody)
    )
)]
pub async fn register(
    State(state): State<SharedState>,
    ValidJson(payload): ValidJson<RegisterRequest>,
) -> Result<Json<RegistrationResponse>, AppError> {
    let response = registration_service::register(&state, payload).await?;
    Ok(Json(response))
}

/// Fetch a registered member by transport identity.
#[utoipa::path(
    get,
    path = "/users/{identity}",
    tag = "members",
    params(("identity" = i64, Path, description = "Transport identity of the member")),
    responses(
        (status = 200, description = "Registered member", body = UserSummary),
        (status = 404, description = "Not registered", body = ErrorBody)
    )
)]
pub async fn get_user(
    State(state): State<SharedState>,
    Path(identity): Path<Identity>,
) -> Result<Json<UserSummary>, AppError> {
    let user = registration_service::get_user(&state, identity).await?;
    Ok(Json(user))
}
