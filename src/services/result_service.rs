use tracing::{debug, info, warn};

use crate::{
    config::RejectedEvidencePolicy,
    dao::models::{Board, ResultEntity, SubmitOutcome},
    dto::{
        submission::{ResultSummary, SubmissionOutcome, SubmissionResponse, SubmitRequest},
        validation::{message_of, parse_lap_time, validate_evidence_path},
    },
    error::ServiceError,
    state::SharedState,
};

/// Offer a lap time as the member's personal best on one board.
///
/// The per-quadruple lock is held until the store has committed, so two conversations of the
/// same member cannot interleave. Evidence files are released only after the commit.
pub async fn submit(
    state: &SharedState,
    request: SubmitRequest,
) -> Result<SubmissionResponse, ServiceError> {
    let time = parse_lap_time(&request.time)
        .map_err(|err| ServiceError::InvalidInput(message_of(&err)))?;
    if let Some(path) = request.evidence_path.as_deref() {
        validate_evidence_path(path).map_err(|err| ServiceError::InvalidInput(message_of(&err)))?;
    }
    let board = Board::new(request.simulator, request.track, request.mode);

    let store = state.require_result_store().await?;
    if store.find_user(request.identity).await?.is_none() {
        return Err(ServiceError::NotFound(
            "You are not registered yet. Please register first".into(),
        ));
    }

    let candidate = ResultEntity::new(request.identity, board, time, request.evidence_path);
    let candidate_evidence = candidate.evidence_path.clone();

    let outcome = {
        let _guard = state.submission_locks().acquire(candidate.quadruple()).await;
        store.submit(candidate).await?
    };

    let response = match outcome {
        SubmitOutcome::Inserted(current) => {
            info!(identity = current.identity, %board, time = current.best_time, "result saved");
            SubmissionResponse {
                outcome: SubmissionOutcome::Saved,
                reply: format!(
                    "Result {:.3} saved for {}, {}, {}.",
                    current.best_time,
                    board.simulator.label(),
                    board.mode.label().to_lowercase(),
                    board.track.label()
                ),
                result: ResultSummary::from(&current),
                previous_best: None,
            }
        }
        SubmitOutcome::Replaced { current, previous } => {
            info!(
                identity = current.identity,
                %board,
                time = current.best_time,
                previous = previous.best_time,
                "personal best improved"
            );
            if let Some(path) = previous
                .evidence_path
                .as_deref()
                .filter(|path| current.evidence_path.as_deref() != Some(*path))
            {
                release_evidence(state, path).await;
            }
            SubmissionResponse {
                outcome: SubmissionOutcome::Improved,
                reply: format!(
                    "New personal best {:.3}! Previous best was {:.3}.",
                    current.best_time, previous.best_time
                ),
                result: ResultSummary::from(&current),
                previous_best: Some(previous.best_time),
            }
        }
        SubmitOutcome::Rejected { best } => {
            info!(
                identity = best.identity,
                %board,
                time,
                best = best.best_time,
                "result not better than personal best"
            );
            // The same file may already back the stored best.
            if let Some(path) = candidate_evidence
                .as_deref()
                .filter(|path| best.evidence_path.as_deref() != Some(*path))
            {
                match state.config().rejected_evidence() {
                    RejectedEvidencePolicy::Discard => release_evidence(state, path).await,
                    RejectedEvidencePolicy::Keep => {
                        debug!(path, "keeping evidence of rejected result")
                    }
                }
            }
            SubmissionResponse {
                outcome: SubmissionOutcome::Rejected,
                reply: format!(
                    "Your time {:.3} is worse than your previous result {:.3}; not saved.",
                    time, best.best_time
                ),
                result: ResultSummary::from(&best),
                previous_best: None,
            }
        }
    };

    Ok(response)
}

async fn release_evidence(state: &SharedState, path: &str) {
    if let Err(err) = state.evidence().discard(path).await {
        warn!(path, error = %err, "failed to release evidence file");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::future::BoxFuture;
    use tempfile::TempDir;
    use time::macros::date;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            evidence::FsEvidenceStore,
            models::{
                FlightMode, Identity, LeaderboardRow, Quadruple, Simulator, Track, UserEntity,
            },
            result_store::{ResultStore, memory::MemoryResultStore},
            storage::{StorageError, StorageResult},
        },
        state::AppState,
    };

    const PILOT: Identity = 42;

    fn pilot() -> UserEntity {
        UserEntity {
            identity: PILOT,
            last_name: "Ivanov".into(),
            first_name: "Ivan".into(),
            group: "7B".into(),
            birth_date: date!(2008 - 04 - 12),
        }
    }

    fn request(time: &str, evidence_path: Option<&str>) -> SubmitRequest {
        SubmitRequest {
            identity: PILOT,
            simulator: Simulator::Liftoff,
            track: Track::Map1,
            mode: FlightMode::Acro,
            time: time.into(),
            evidence_path: evidence_path.map(str::to_owned),
        }
    }

    fn touch(dir: &TempDir, name: &str) {
        std::fs::write(dir.path().join(name), b"png").unwrap();
    }

    fn exists(dir: &TempDir, name: &str) -> bool {
        dir.path().join(name).exists()
    }

    async fn setup(policy: RejectedEvidencePolicy) -> (SharedState, MemoryResultStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::default().with_rejected_evidence(policy);
        let state = AppState::new(config, Arc::new(FsEvidenceStore::new(dir.path())));
        let store = MemoryResultStore::new();
        store.upsert_user(pilot()).await.unwrap();
        state.set_result_store(Arc::new(store.clone())).await;
        (state, store, dir)
    }

    #[tokio::test]
    async fn insert_reject_then_replace() {
        let (state, store, _dir) = setup(RejectedEvidencePolicy::Discard).await;

        let first = submit(&state, request("38.106", None)).await.unwrap();
        assert_eq!(first.outcome, SubmissionOutcome::Saved);

        let worse = submit(&state, request("40", None)).await.unwrap();
        assert_eq!(worse.outcome, SubmissionOutcome::Rejected);
        assert_eq!(worse.result.best_time, 38.106);
        assert!(worse.reply.contains("38.106"));

        let better = submit(&state, request("35,5", None)).await.unwrap();
        assert_eq!(better.outcome, SubmissionOutcome::Improved);
        assert_eq!(better.previous_best, Some(38.106));
        assert_eq!(store.result_count().await, 1);
    }

    #[tokio::test]
    async fn replacing_releases_previous_evidence() {
        let (state, _store, dir) = setup(RejectedEvidencePolicy::Discard).await;
        touch(&dir, "old.png");
        touch(&dir, "new.png");

        submit(&state, request("38.106", Some("old.png"))).await.unwrap();
        submit(&state, request("35.5", Some("new.png"))).await.unwrap();

        assert!(!exists(&dir, "old.png"));
        assert!(exists(&dir, "new.png"));
    }

    #[tokio::test]
    async fn rejected_evidence_is_discarded_by_default() {
        let (state, _store, dir) = setup(RejectedEvidencePolicy::Discard).await;
        touch(&dir, "best.png");
        touch(&dir, "slow.png");

        submit(&state, request("38.106", Some("best.png"))).await.unwrap();
        submit(&state, request("40", Some("slow.png"))).await.unwrap();

        assert!(exists(&dir, "best.png"));
        assert!(!exists(&dir, "slow.png"));
    }

    #[tokio::test]
    async fn rejected_evidence_can_be_kept() {
        let (state, _store, dir) = setup(RejectedEvidencePolicy::Keep).await;
        touch(&dir, "best.png");
        touch(&dir, "slow.png");

        submit(&state, request("38.106", Some("best.png"))).await.unwrap();
        submit(&state, request("40", Some("slow.png"))).await.unwrap();

        assert!(exists(&dir, "best.png"));
        assert!(exists(&dir, "slow.png"));
    }

    #[tokio::test]
    async fn missing_evidence_file_does_not_fail_submission() {
        let (state, _store, _dir) = setup(RejectedEvidencePolicy::Discard).await;
        submit(&state, request("38.106", Some("gone.png"))).await.unwrap();
        let better = submit(&state, request("30", Some("7/new.png"))).await.unwrap();
        assert_eq!(better.outcome, SubmissionOutcome::Improved);
    }

    #[tokio::test]
    async fn evidence_outside_the_directory_is_refused() {
        let (state, store, _dir) = setup(RejectedEvidencePolicy::Discard).await;
        for path in ["../escape.png", "/etc/passwd", "a/../../b.png"] {
            assert!(matches!(
                submit(&state, request("30", Some(path))).await,
                Err(ServiceError::InvalidInput(_))
            ));
        }
        assert_eq!(store.result_count().await, 0);
    }

    #[tokio::test]
    async fn resubmitted_evidence_of_the_best_is_never_released() {
        let (state, _store, dir) = setup(RejectedEvidencePolicy::Discard).await;
        touch(&dir, "best.png");

        submit(&state, request("38.106", Some("best.png"))).await.unwrap();
        let again = submit(&state, request("38.106", Some("best.png"))).await.unwrap();

        assert_eq!(again.outcome, SubmissionOutcome::Rejected);
        assert!(exists(&dir, "best.png"));
    }

    #[tokio::test]
    async fn unregistered_member_cannot_submit() {
        let (state, store, _dir) = setup(RejectedEvidencePolicy::Discard).await;
        let mut stranger = request("38.106", None);
        stranger.identity = 7;
        assert!(matches!(
            submit(&state, stranger).await,
            Err(ServiceError::NotFound(_))
        ));
        assert_eq!(store.result_count().await, 0);
    }

    #[tokio::test]
    async fn malformed_time_is_invalid_input() {
        let (state, store, _dir) = setup(RejectedEvidencePolicy::Discard).await;
        for text in ["fast", "0", "-1", ""] {
            assert!(matches!(
                submit(&state, request(text, None)).await,
                Err(ServiceError::InvalidInput(_))
            ));
        }
        assert_eq!(store.result_count().await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_submissions_keep_one_best() {
        let (state, store, _dir) = setup(RejectedEvidencePolicy::Discard).await;

        let tasks: Vec<_> = (0..50)
            .map(|i| {
                let state = state.clone();
                let time = format!("{}", 100 - i);
                tokio::spawn(async move { submit(&state, request(&time, None)).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(store.result_count().await, 1);
        let key = Quadruple {
            identity: PILOT,
            board: Board::new(Simulator::Liftoff, Track::Map1, FlightMode::Acro),
        };
        assert_eq!(store.find_result(key).await.unwrap().best_time, 51.0);
        assert!(state.submission_locks().is_empty());
    }

    /// Knows the pilot but cannot commit anything.
    struct BrokenStore;

    impl ResultStore for BrokenStore {
        fn upsert_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<UserEntity>> {
            Box::pin(async move { Ok(user) })
        }

        fn find_user(&self, _: Identity) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
            Box::pin(async { Ok(Some(pilot())) })
        }

        fn submit(&self, _: ResultEntity) -> BoxFuture<'static, StorageResult<SubmitOutcome>> {
            Box::pin(async {
                Err(StorageError::unavailable(
                    "commit".into(),
                    std::io::Error::other("connection reset"),
                ))
            })
        }

        fn leaderboard(
            &self,
            _: Board,
            _: usize,
        ) -> BoxFuture<'static, StorageResult<Vec<LeaderboardRow>>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    #[tokio::test]
    async fn failed_commit_keeps_every_evidence_file() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "new.png");
        let state = AppState::new(
            AppConfig::default(),
            Arc::new(FsEvidenceStore::new(dir.path())),
        );
        state.set_result_store(Arc::new(BrokenStore)).await;

        let err = submit(&state, request("30", Some("new.png"))).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unavailable(_)));
        assert!(exists(&dir, "new.png"));
        assert!(state.submission_locks().is_empty());
    }
}
