#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{
    Board, Identity, LeaderboardRow, ResultEntity, SubmitOutcome, UserEntity,
};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;

/// Abstraction over the persistence layer for club members and their personal bests.
///
/// Implementations must keep at most one result per quadruple: [`ResultStore::submit`]
/// either inserts, atomically replaces a slower row, or leaves the store untouched.
pub trait ResultStore: Send + Sync {
    /// Create the user or overwrite every field of an existing one.
    fn upsert_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<UserEntity>>;
    /// Registered member with this identity, if any.
    fn find_user(&self, identity: Identity) -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;
    /// Offer a candidate personal best for its quadruple.
    fn submit(&self, candidate: ResultEntity) -> BoxFuture<'static, StorageResult<SubmitOutcome>>;
    /// Up to `limit` rows of `board`, best time first.
    fn leaderboard(
        &self,
        board: Board,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<LeaderboardRow>>>;
    /// Cheap round trip to the backend; an error marks the store unhealthy.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the backend connection after failed health checks.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}

/// Decide what a store must do with `candidate` given the row currently held for its quadruple.
pub fn decide(candidate: ResultEntity, stored: Option<ResultEntity>) -> SubmitOutcome {
    match stored {
        None => SubmitOutcome::Inserted(candidate),
        Some(previous) if candidate.beats(&previous) => SubmitOutcome::Replaced {
            current: candidate,
            previous,
        },
        Some(best) => SubmitOutcome::Rejected { best },
    }
}
