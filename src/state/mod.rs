mod submission_locks;

use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::{
    config::AppConfig,
    dao::{evidence::EvidenceStore, result_store::ResultStore},
    error::ServiceError,
};

pub use self::submission_locks::SubmissionLocks;

pub type SharedState = Arc<AppState>;

/// Central application state storing the storage handle, evidence store and configuration.
pub struct AppState {
    result_store: RwLock<Option<Arc<dyn ResultStore>>>,
    evidence: Arc<dyn EvidenceStore>,
    config: AppConfig,
    submission_locks: SubmissionLocks,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig, evidence: Arc<dyn EvidenceStore>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            result_store: RwLock::new(None),
            evidence,
            config,
            submission_locks: SubmissionLocks::default(),
            degraded: degraded_tx,
        })
    }

    /// Obtain a handle to the current result store, if one is installed.
    pub async fn result_store(&self) -> Option<Arc<dyn ResultStore>> {
        let guard = self.result_store.read().await;
        guard.as_ref().cloned()
    }

    /// Current store, or [`ServiceError::Degraded`] while none is installed.
    pub async fn require_result_store(&self) -> Result<Arc<dyn ResultStore>, ServiceError> {
        self.result_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new result store implementation and leave degraded mode.
    pub async fn set_result_store(&self, store: Arc<dyn ResultStore>) {
        {
            let mut guard = self.result_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current result store and enter degraded mode.
    pub async fn clear_result_store(&self) {
        {
            let mut guard = self.result_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    /// Store holding screenshots attached to submissions.
    pub fn evidence(&self) -> &Arc<dyn EvidenceStore> {
        &self.evidence
    }

    /// Configuration loaded at startup.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Per-quadruple locks serializing submissions across conversations.
    pub fn submission_locks(&self) -> &SubmissionLocks {
        &self.submission_locks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::{evidence::FsEvidenceStore, result_store::memory::MemoryResultStore};

    #[tokio::test]
    async fn degraded_until_a_store_is_installed() {
        let state = AppState::new(AppConfig::default(), Arc::new(FsEvidenceStore::new("evidence")));
        let mut watcher = state.degraded_watcher();
        assert!(state.is_degraded());
        assert!(matches!(
            state.require_result_store().await,
            Err(ServiceError::Degraded)
        ));

        state
            .set_result_store(Arc::new(MemoryResultStore::new()))
            .await;
        assert!(!state.is_degraded());
        assert!(watcher.has_changed().unwrap());
        assert!(!*watcher.borrow_and_update());
        assert!(state.require_result_store().await.is_ok());

        state.clear_result_store().await;
        assert!(state.is_degraded());
    }
}
