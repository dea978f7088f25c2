use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::leaderboard::{LeaderboardQuery, LeaderboardResponse},
    error::{AppError, ErrorBody},
    routes::extract::ValidQuery,
    services::leaderboard_service,
    state::SharedState,
};

/// Leaderboard routes.
pub fn router() -> Router<SharedState> {
    Router::new().route("/leaderboard", get(get_leaderboard))
}

/// Ranked personal bests of one simulator, track and mode.
#[utoipa::path(
    get,
    path = "/leaderboard",
    tag = "leaderboard",
    params(LeaderboardQuery),
    responses(
        (status = 200, description = "Ranked board with rendered text", body = LeaderboardResponse),
        (status = 400, description = "Unknown option or limit out of range", body = ErrorBody),
        (status = 503, description = "Storage unavailable", body = ErrorBody)
    )
)]
pub async fn get_leaderboard(
    State(state): State<SharedState>,
    ValidQuery(query): ValidQuery<LeaderboardQuery>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    let response = leaderboard_service::leaderboard(&state, query).await?;
    Ok(Json(response))
}
