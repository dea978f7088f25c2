use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::dao::models::Quadruple;

/// Async mutex per quadruple; two conversations submitting for the same slot queue up.
#[derive(Default)]
pub struct SubmissionLocks {
    slots: DashMap<Quadruple, Arc<Mutex<()>>>,
}

/// Held while a submission for one quadruple is in flight.
pub struct SubmissionGuard<'a> {
    locks: &'a SubmissionLocks,
    key: Quadruple,
    guard: Option<OwnedMutexGuard<()>>,
}

impl SubmissionLocks {
    /// Wait until no other submission for `key` is running.
    pub async fn acquire(&self, key: Quadruple) -> SubmissionGuard<'_> {
        // Clone the Arc out so the shard lock is not held across the await.
        let slot = self.slots.entry(key).or_default().clone();
        let guard = slot.lock_owned().await;
        SubmissionGuard {
            locks: self,
            key,
            guard: Some(guard),
        }
    }

    /// Number of quadruples with a live lock entry.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when no submission holds or awaits a lock.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Drop for SubmissionGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map still references an idle slot.
        self.locks
            .slots
            .remove_if(&self.key, |_, slot| Arc::strong_count(slot) == 1);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::dao::models::{Board, FlightMode, Simulator, Track};

    fn key(identity: i64) -> Quadruple {
        Quadruple {
            identity,
            board: Board::new(Simulator::Liftoff, Track::Map1, FlightMode::Acro),
        }
    }

    #[tokio::test]
    async fn same_quadruple_waits_for_the_holder() {
        let locks = Arc::new(SubmissionLocks::default());
        let first = locks.acquire(key(1)).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(key(1)).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(first);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn different_quadruples_do_not_block() {
        let locks = SubmissionLocks::default();
        let _first = locks.acquire(key(1)).await;
        let second = tokio::time::timeout(Duration::from_millis(100), locks.acquire(key(2))).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn idle_entries_are_pruned() {
        let locks = SubmissionLocks::default();
        {
            let _guard = locks.acquire(key(1)).await;
            assert_eq!(locks.len(), 1);
        }
        assert!(locks.is_empty());
    }
}
