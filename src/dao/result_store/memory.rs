//! In-process [`ResultStore`] used for local development and tests.

use std::{collections::HashMap, sync::Arc};

use futures::future::BoxFuture;
use tokio::sync::RwLock;

use crate::dao::{
    models::{
        Board, Identity, LeaderboardRow, Quadruple, ResultEntity, SubmitOutcome, UserEntity,
        rank_order,
    },
    result_store::{ResultStore, decide},
    storage::StorageResult,
};

/// Memory-backed store. Writers take the lock exclusively, so every submit is atomic.
#[derive(Clone, Default)]
pub struct MemoryResultStore {
    inner: Arc<RwLock<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    users: HashMap<Identity, UserEntity>,
    results: HashMap<Quadruple, ResultEntity>,
}

impl MemoryResultStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current best stored for a quadruple, if any.
    pub async fn find_result(&self, key: Quadruple) -> Option<ResultEntity> {
        self.inner.read().await.results.get(&key).cloned()
    }

    /// Number of results stored across every board.
    pub async fn result_count(&self) -> usize {
        self.inner.read().await.results.len()
    }
}

impl MemoryState {
    fn submit(&mut self, candidate: ResultEntity) -> SubmitOutcome {
        let key = candidate.quadruple();
        let outcome = decide(candidate, self.results.get(&key).cloned());
        match &outcome {
            SubmitOutcome::Inserted(current) | SubmitOutcome::Replaced { current, .. } => {
                self.results.insert(key, current.clone());
            }
            SubmitOutcome::Rejected { .. } => {}
        }
        outcome
    }

    fn leaderboard(&self, board: Board, limit: usize) -> Vec<LeaderboardRow> {
        let mut matches: Vec<&ResultEntity> = self
            .results
            .values()
            .filter(|result| result.board == board)
            .collect();
        matches.sort_by(|a, b| rank_order(a, b));

        matches
            .into_iter()
            .filter_map(|result| {
                self.users
                    .get(&result.identity)
                    .map(|user| LeaderboardRow::from_parts(user, result))
            })
            .take(limit)
            .collect()
    }
}

impl ResultStore for MemoryResultStore {
    fn upsert_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<UserEntity>> {
        let store = self.clone();
        Box::pin(async move {
            let mut guard = store.inner.write().await;
            guard.users.insert(user.identity, user.clone());
            Ok(user)
        })
    }

    fn find_user(&self, identity: Identity) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.read().await.users.get(&identity).cloned()) })
    }

    fn submit(&self, candidate: ResultEntity) -> BoxFuture<'static, StorageResult<SubmitOutcome>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.write().await.submit(candidate)) })
    }

    fn leaderboard(
        &self,
        board: Board,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<LeaderboardRow>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.read().await.leaderboard(board, limit)) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
