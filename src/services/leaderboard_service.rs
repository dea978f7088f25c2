use time::OffsetDateTime;
use tracing::debug;

use crate::{
    config::MAX_LEADERBOARD_LIMIT,
    dao::models::Board,
    dto::leaderboard::{LeaderboardEntry, LeaderboardQuery, LeaderboardResponse},
    error::ServiceError,
    services::leaderboard_render::{render, render_header},
    state::SharedState,
};

/// Top results of one board, best first, with the rendered text.
pub async fn leaderboard(
    state: &SharedState,
    query: LeaderboardQuery,
) -> Result<LeaderboardResponse, ServiceError> {
    leaderboard_at(state, query, OffsetDateTime::now_utc()).await
}

/// `now` is shown in the header on the club's wall clock.
async fn leaderboard_at(
    state: &SharedState,
    query: LeaderboardQuery,
    now: OffsetDateTime,
) -> Result<LeaderboardResponse, ServiceError> {
    let limit = query.limit.unwrap_or_else(|| state.config().leaderboard_limit());
    if !(1..=MAX_LEADERBOARD_LIMIT).contains(&limit) {
        return Err(ServiceError::InvalidInput(format!(
            "limit must be between 1 and {MAX_LEADERBOARD_LIMIT}"
        )));
    }
    let board = Board::new(query.simulator, query.track, query.mode);

    let store = state.require_result_store().await?;
    let rows = store.leaderboard(board, limit).await?;
    debug!(%board, limit, rows = rows.len(), "leaderboard loaded");

    let now = now.to_offset(state.config().utc_offset());
    let reply = format!(
        "{}\n\n{}",
        render_header(state.config().club_name(), board, now),
        render(&rows, limit)
    );

    let entries = rows
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(index, row)| LeaderboardEntry {
            rank: index + 1,
            identity: row.identity,
            last_name: row.last_name,
            first_name: row.first_name,
            group: row.group,
            best_time: row.best_time,
        })
        .collect();

    Ok(LeaderboardResponse {
        simulator: board.simulator,
        track: board.track,
        mode: board.mode,
        limit,
        entries,
        reply,
    })
}
