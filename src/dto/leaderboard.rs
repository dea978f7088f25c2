use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::dao::models::{FlightMode, Identity, Simulator, Track};

/// Query string of `GET /leaderboard`.
#[derive(Debug, Deserialize, IntoParams, Validate)]
#[into_params(parameter_in = Query)]
pub struct LeaderboardQuery {
    pub simulator: Simulator,
    pub track: Track,
    pub mode: FlightMode,
    /// Number of ranks to print; the configured default when absent.
    #[validate(range(min = 1, max = 50))]
    pub limit: Option<usize>,
}

/// One occupied rank.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub identity: Identity,
    pub last_name: String,
    pub first_name: String,
    pub group: String,
    pub best_time: f64,
}

/// Ranked board plus its rendered text.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LeaderboardResponse {
    pub simulator: Simulator,
    pub track: Track,
    pub mode: FlightMode,
    /// Number of ranks rendered, occupied or not.
    pub limit: usize,
    pub entries: Vec<LeaderboardEntry>,
    /// Header followed by exactly `limit` numbered lines.
    pub reply: String,
}
