use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;
use utoipa::ToSchema;

use crate::dao::storage::StorageError;

/// Reply shown to club members when storage is not reachable.
pub const TRY_AGAIN_REPLY: &str = "Something went wrong on our side. Please try again.";
/// Reply shown when two submissions raced for the same slot.
pub const CONFLICT_REPLY: &str = "Your result was being updated at the same moment. Please try again.";

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// A concurrent writer changed the record; the caller may retry the whole step.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Malformed text supplied by the transport; the member should be re-prompted.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict { message } => ServiceError::Conflict(message),
            other => ServiceError::Unavailable(other),
        }
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("{0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("{0}")]
    NotFound(String),
    /// Conflict with a concurrent update.
    #[error("{0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("{0}")]
    ServiceUnavailable(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => {
                warn!(error = %source, "storage operation failed");
                AppError::ServiceUnavailable(TRY_AGAIN_REPLY.into())
            }
            ServiceError::Degraded => {
                warn!("storage operation attempted in degraded mode");
                AppError::ServiceUnavailable(TRY_AGAIN_REPLY.into())
            }
            ServiceError::Conflict(message) => {
                warn!(%message, "submission lost a write race");
                AppError::Conflict(CONFLICT_REPLY.into())
            }
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
        }
    }
}

/// Error payload; `message` is safe to relay to the member verbatim.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Text safe to relay to the member.
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_conflict_maps_to_conflict() {
        let err: ServiceError = StorageError::conflict("result::liftoff").into();
        assert!(matches!(err, ServiceError::Conflict(_)));
        let app: AppError = err.into();
        assert!(matches!(app, AppError::Conflict(ref message) if message == CONFLICT_REPLY));
    }

    #[test]
    fn outages_hide_their_cause_from_members() {
        let source = std::io::Error::other("connection refused");
        let err: ServiceError = StorageError::unavailable("ping".into(), source).into();
        let app: AppError = err.into();
        assert_eq!(app.to_string(), TRY_AGAIN_REPLY);
        assert_eq!(
            app.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
