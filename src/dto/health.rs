use serde::Serialize;
use utoipa::ToSchema;

/// Health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
}

impl HealthResponse {
    /// Storage reachable; results can be saved.
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }

    /// No storage connection; every data operation answers 503.
    pub fn degraded() -> Self {
        Self {
            status: "degraded".to_string(),
        }
    }
}
