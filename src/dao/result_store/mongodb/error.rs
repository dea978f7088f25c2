use mongodb::error::{Error as MongoError, ErrorKind, TRANSIENT_TRANSACTION_ERROR, WriteFailure};
use thiserror::Error;

use crate::dao::models::{Board, Identity};

/// Convenient result alias returning [`MongoDaoError`] failures.
pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

const DUPLICATE_KEY_CODE: i32 = 11000;

/// Failures that can occur while interacting with MongoDB.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB did not answer `hello` after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB deployment behind `{database}` is a standalone server; transactions need a replica set")]
    StandaloneServer { database: String },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to save user `{identity}`")]
    SaveUser {
        identity: Identity,
        #[source]
        source: MongoError,
    },
    #[error("failed to load user `{identity}`")]
    LoadUser {
        identity: Identity,
        #[source]
        source: MongoError,
    },
    #[error("failed to submit result for user `{identity}` on `{board}`")]
    SubmitResult {
        identity: Identity,
        board: Board,
        #[source]
        source: MongoError,
    },
    #[error("failed to load leaderboard `{board}`")]
    LoadLeaderboard {
        board: Board,
        #[source]
        source: MongoError,
    },
    #[error("stored document `{id}` is malformed: {reason}")]
    MalformedDocument { id: String, reason: String },
}

impl MongoDaoError {
    /// True when the failure comes from a competing writer rather than an outage.
    pub fn is_conflict(&self) -> bool {
        match self {
            MongoDaoError::SaveUser { source, .. } | MongoDaoError::SubmitResult { source, .. } => {
                is_write_conflict(source)
            }
            _ => false,
        }
    }
}

fn is_write_conflict(err: &MongoError) -> bool {
    if err.contains_label(TRANSIENT_TRANSACTION_ERROR) {
        return true;
    }
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY_CODE
    )
}
