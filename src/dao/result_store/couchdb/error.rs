//! Error types shared by the CouchDB storage implementation.

use reqwest::StatusCode;
use thiserror::Error;

/// Convenient result alias returning [`CouchDaoError`] failures.
pub type CouchResult<T> = Result<T, CouchDaoError>;

/// Failures that can occur while interacting with CouchDB.
#[derive(Debug, Error)]
pub enum CouchDaoError {
    /// Required environment variable is missing.
    #[error("missing CouchDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    /// Building the HTTP client failed.
    #[error("failed to build CouchDB client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// The results database could not be queried or created.
    #[error("failed to reach CouchDB database `{database}`")]
    Database {
        database: String,
        #[source]
        source: reqwest::Error,
    },
    /// CouchDB answered a database operation with an unexpected status.
    #[error("unexpected CouchDB database response status {status} for `{database}`")]
    DatabaseStatus {
        database: String,
        status: StatusCode,
    },
    /// A document request could not be sent.
    #[error("failed to send CouchDB request to `{path}`")]
    RequestSend {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// CouchDB answered a document request with an unexpected status.
    #[error("unexpected CouchDB response status {status} for `{path}`")]
    RequestStatus { path: String, status: StatusCode },
    /// A write carried a `_rev` that is no longer current.
    #[error("document `{doc_id}` was updated concurrently")]
    RevisionConflict { doc_id: String },
    /// Response payload was not the expected JSON.
    #[error("failed to decode CouchDB response for `{path}`")]
    DecodeResponse {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// A JSON value did not match the expected model.
    #[error("failed to deserialize CouchDB value for `{path}`")]
    DeserializeValue {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    /// A stored user or result holds a value the domain model cannot represent.
    #[error("malformed CouchDB document `{doc_id}`: {reason}")]
    MalformedDocument { doc_id: String, reason: String },
}

impl CouchDaoError {
    /// Error for a failed write to `doc_id`; 409 means another writer won the revision race.
    pub fn write_rejected(doc_id: &str, status: StatusCode) -> Self {
        if status == StatusCode::CONFLICT {
            CouchDaoError::RevisionConflict {
                doc_id: doc_id.to_owned(),
            }
        } else {
            CouchDaoError::RequestStatus {
                path: doc_id.to_owned(),
                status,
            }
        }
    }

    /// True when the failure comes from a competing writer rather than an outage.
    pub fn is_conflict(&self) -> bool {
        matches!(self, CouchDaoError::RevisionConflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_revision_is_a_conflict() {
        let err = CouchDaoError::write_rejected("result::liftoff::map1::acro::42", StatusCode::CONFLICT);
        assert!(err.is_conflict());
        assert!(err.to_string().contains("result::liftoff::map1::acro::42"));
    }

    #[test]
    fn other_write_failures_are_outages() {
        let err = CouchDaoError::write_rejected("user::42", StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.is_conflict());
        assert!(matches!(
            err,
            CouchDaoError::RequestStatus {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                ..
            }
        ));
    }
}
