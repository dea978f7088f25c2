use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::submission::{SubmissionResponse, SubmitRequest},
    error::{AppError, ErrorBody},
    routes::extract::ValidJson,
    services::result_service,
    state::SharedState,
};

/// Result submission routes.
pub fn router() -> Router<SharedState> {
    Router::new().route("/results", post(submit_result))
}

/// Offer a lap time. A slower time is a successful `rejected` outcome, not an error.
#[utoipa::path(
    post,
    path = "/results",
    tag = "results",
    request_body = SubmitRequest,
    responses(
        (status = 200, description = "Saved, improved or rejected", body = SubmissionResponse),
        (status = 400, description = "Malformed time", body = ErrorBody),
        (status = 404, description = "Member not registered", body = ErrorBody),
        (status = 409, description = "Concurrent update; try again", body = ErrorBody),
        (status = 503, description = "Storage unavailable", body = ErrorBody)
    )
)]
pub async fn submit_result(
    State(state): State<SharedState>,
    ValidJson(payload): ValidJson<SubmitRequest>,
) -> Result<Json<SubmissionResponse>, AppError> {
    let response = result_service::submit(&state, payload).await?;
    Ok(Json(response))
}
