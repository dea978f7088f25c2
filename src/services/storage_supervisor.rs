use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{result_store::ResultStore, storage::StorageError},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

fn backoff(delay: Duration) -> Duration {
    (delay * 2).min(MAX_DELAY)
}

/// Keep a result store installed in the shared state.
///
/// Connects with exponential backoff, then polls the store's health. After
/// `MAX_RECONNECT_ATTEMPTS` failed reconnects the store is dropped and a fresh
/// connection is built; requests meanwhile fail fast in degraded mode.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn ResultStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        let store = match connect().await {
            Ok(store) => store,
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
                sleep(delay).await;
                delay = backoff(delay);
                continue;
            }
        };

        state.set_result_store(store.clone()).await;
        info!("storage connection established; leaving degraded mode");
        delay = INITIAL_DELAY;

        while watch_health(&state, store.as_ref()).await {}

        state.clear_result_store().await;
        warn!("exhausted storage reconnect attempts; rebuilding connection");
        sleep(delay).await;
        delay = backoff(delay);
    }
}

/// One poll cycle. Returns `false` once the store could not be brought back.
async fn watch_health(state: &SharedState, store: &dyn ResultStore) -> bool {
    if store.health_check().await.is_ok() {
        if state.is_degraded() {
            info!("storage healthy again; leaving degraded mode");
            state.update_degraded(false);
        }
        sleep(HEALTH_POLL_INTERVAL).await;
        return true;
    }

    let mut reconnect_delay = INITIAL_DELAY;
    for attempt in 0..MAX_RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => {
                info!(attempt, "storage reconnection succeeded after health check failure");
                state.update_degraded(false);
                sleep(HEALTH_POLL_INTERVAL).await;
                return true;
            }
            Err(err) => {
                if attempt == 0 {
                    warn!(attempt, error = %err, "storage reconnect failed; entering degraded mode");
                    state.update_degraded(true);
                } else {
                    warn!(attempt, error = %err, "storage reconnect attempt failed");
                }
                sleep(reconnect_delay).await;
                reconnect_delay = backoff(reconnect_delay);
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dao::{evidence::FsEvidenceStore, result_store::memory::MemoryResultStore},
        state::AppState,
    };

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        assert_eq!(backoff(INITIAL_DELAY), Duration::from_secs(2));
        assert_eq!(backoff(Duration::from_secs(8)), MAX_DELAY);
        assert_eq!(backoff(MAX_DELAY), MAX_DELAY);
    }

    #[tokio::test]
    async fn installs_the_connected_store() {
        let state = AppState::new(AppConfig::default(), Arc::new(FsEvidenceStore::new("evidence")));
        let mut watcher = state.degraded_watcher();
        let task = tokio::spawn(run(state.clone(), || async {
            Ok(Arc::new(MemoryResultStore::new()) as Arc<dyn ResultStore>)
        }));

        tokio::time::timeout(Duration::from_secs(1), watcher.wait_for(|degraded| !degraded))
            .await
            .unwrap()
            .unwrap();
        assert!(state.result_store().await.is_some());
        task.abort();
    }
}
