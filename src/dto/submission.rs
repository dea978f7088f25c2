use serde::{Deserialize, Serialize};
use serde_with::{NoneAsEmptyString, serde_as};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{FlightMode, Identity, ResultEntity, Simulator, Track},
    dto::format_system_time,
};

/// A lap time offered as a new personal best.
#[serde_as]
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SubmitRequest {
    pub identity: Identity,
    pub simulator: Simulator,
    pub track: Track,
    pub mode: FlightMode,
    /// Seconds as typed by the member; `38.106` and `38,106` are both accepted.
    #[schema(example = "38.106")]
    #[validate(length(min = 1, max = 32))]
    pub time: String,
    /// Path of the screenshot, relative to the evidence directory. Empty means none.
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub evidence_path: Option<String>,
}

/// What the store did with a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionOutcome {
    /// First result for this simulator, track and mode.
    Saved,
    /// Beat the previous personal best, which was replaced.
    Improved,
    /// Not faster than the stored personal best; nothing changed.
    Rejected,
}

/// The personal best held after the submission.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResultSummary {
    pub id: Uuid,
    pub simulator: Simulator,
    pub track: Track,
    pub mode: FlightMode,
    pub best_time: f64,
    /// RFC 3339 timestamp.
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence_path: Option<String>,
}

impl From<&ResultEntity> for ResultSummary {
    fn from(result: &ResultEntity) -> Self {
        Self {
            id: result.id,
            simulator: result.board.simulator,
            track: result.board.track,
            mode: result.board.mode,
            best_time: result.best_time,
            created_at: format_system_time(result.created_at),
            evidence_path: result.evidence_path.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmissionResponse {
    pub outcome: SubmissionOutcome,
    pub result: ResultSummary,
    /// Time that was replaced, when the outcome is `improved`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_best: Option<f64>,
    pub reply: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_evidence_path_means_none() {
        let request: SubmitRequest = serde_json::from_str(
            r#"{"identity": 7, "simulator": "liftoff", "track": "map1", "mode": "acro",
                "time": "38,106", "evidence_path": ""}"#,
        )
        .unwrap();
        assert_eq!(request.evidence_path, None);
        assert_eq!(request.simulator, Simulator::Liftoff);

        let request: SubmitRequest = serde_json::from_str(
            r#"{"identity": 7, "simulator": "Liftoff", "track": "map1", "mode": "Acro",
                "time": "38.1"}"#,
        )
        .unwrap();
        assert_eq!(request.evidence_path, None);
    }

    #[test]
    fn evidence_path_is_kept_when_present() {
        let request: SubmitRequest = serde_json::from_str(
            r#"{"identity": 7, "simulator": "liftoff", "track": "map2", "mode": "acro",
                "time": "40", "evidence_path": "7/shot.jpg"}"#,
        )
        .unwrap();
        assert_eq!(request.evidence_path.as_deref(), Some("7/shot.jpg"));
    }

    #[test]
    fn unknown_simulator_is_rejected() {
        let parsed = serde_json::from_str::<SubmitRequest>(
            r#"{"identity": 7, "simulator": "velocidrone", "track": "map1", "mode": "acro",
                "time": "40"}"#,
        );
        assert!(parsed.is_err());
    }
}
