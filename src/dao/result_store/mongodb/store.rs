use std::{collections::HashMap, sync::Arc};

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel, bson::doc, error::Error as MongoError,
    options::IndexOptions,
};
use tokio::sync::RwLock;
use tracing::debug;

use super::{
    config::MongoConfig,
    connection::open_database,
    error::{MongoDaoError, MongoResult},
    models::{
        MongoResultDocument, MongoUserDocument, board_filter, quadruple_filter, uuid_as_binary,
    },
};
use crate::dao::{
    models::{
        Board, Identity, LeaderboardRow, ResultEntity, SubmitOutcome, UserEntity,
    },
    result_store::{ResultStore, decide},
    storage::StorageResult,
};

const USER_COLLECTION_NAME: &str = "users";
const RESULT_COLLECTION_NAME: &str = "results";

/// MongoDB-backed [`ResultStore`] implementation.
#[derive(Clone)]
pub struct MongoResultStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            open_database(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoResultStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            open_database(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let results = self.result_collection().await;

        // One current best per quadruple; concurrent inserts lose with a duplicate key.
        let quadruple_index = IndexModel::builder()
            .keys(doc! {"user_id": 1, "simulator": 1, "track": 1, "mode": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("result_quadruple_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        results
            .create_index(quadruple_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: RESULT_COLLECTION_NAME,
                index: "user_id,simulator,track,mode",
                source,
            })?;

        let board_index = IndexModel::builder()
            .keys(doc! {"simulator": 1, "track": 1, "mode": 1, "best_time": 1, "created_at": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("result_board_idx".to_owned()))
                    .build(),
            )
            .build();
        results
            .create_index(board_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: RESULT_COLLECTION_NAME,
                index: "simulator,track,mode,best_time,created_at",
                source,
            })?;

        Ok(())
    }

    async fn client(&self) -> Client {
        let guard = self.inner.state.read().await;
        guard.client.clone()
    }

    async fn user_collection(&self) -> Collection<MongoUserDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoUserDocument>(USER_COLLECTION_NAME)
    }

    async fn result_collection(&self) -> Collection<MongoResultDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoResultDocument>(RESULT_COLLECTION_NAME)
    }

    async fn upsert_user(&self, user: UserEntity) -> MongoResult<UserEntity> {
        let identity = user.identity;
        let document = MongoUserDocument::from(&user);

        self.user_collection()
            .await
            .replace_one(doc! {"_id": identity}, &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveUser { identity, source })?;

        Ok(user)
    }

    async fn find_user(&self, identity: Identity) -> MongoResult<Option<UserEntity>> {
        let document = self
            .user_collection()
            .await
            .find_one(doc! {"_id": identity})
            .await
            .map_err(|source| MongoDaoError::LoadUser { identity, source })?;

        document.map(UserEntity::try_from).transpose()
    }

    /// Lookup, delete and insert run in one transaction so readers never see the
    /// quadruple without a current best, or with two.
    async fn submit(&self, candidate: ResultEntity) -> MongoResult<SubmitOutcome> {
        let key = candidate.quadruple();
        let wrap = |source: MongoError| MongoDaoError::SubmitResult {
            identity: key.identity,
            board: key.board,
            source,
        };

        let client = self.client().await;
        let results = self.result_collection().await;

        let mut session = client.start_session().await.map_err(wrap)?;
        session.start_transaction().await.map_err(wrap)?;

        let stored = results
            .find_one(quadruple_filter(key))
            .session(&mut session)
            .await
            .map_err(wrap)?
            .map(MongoResultDocument::into_entity)
            .transpose()?;

        let outcome = decide(candidate, stored);
        match &outcome {
            SubmitOutcome::Inserted(current) => {
                results
                    .insert_one(MongoResultDocument::from(current))
                    .session(&mut session)
                    .await
                    .map_err(wrap)?;
            }
            SubmitOutcome::Replaced { current, previous } => {
                results
                    .delete_one(doc! {"_id": uuid_as_binary(previous.id)})
                    .session(&mut session)
                    .await
                    .map_err(wrap)?;
                results
                    .insert_one(MongoResultDocument::from(current))
                    .session(&mut session)
                    .await
                    .map_err(wrap)?;
            }
            SubmitOutcome::Rejected { .. } => {
                if let Err(err) = session.abort_transaction().await {
                    debug!(error = %err, "aborting read-only transaction failed");
                }
                return Ok(outcome);
            }
        }

        session.commit_transaction().await.map_err(wrap)?;
        Ok(outcome)
    }

    async fn leaderboard(&self, board: Board, limit: usize) -> MongoResult<Vec<LeaderboardRow>> {
        // A zero limit means "unlimited" to MongoDB.
        if limit == 0 {
            return Ok(Vec::new());
        }
        let wrap = |source: MongoError| MongoDaoError::LoadLeaderboard { board, source };

        let documents: Vec<MongoResultDocument> = self
            .result_collection()
            .await
            .find(board_filter(board))
            .sort(doc! {"best_time": 1, "created_at": 1, "user_id": 1})
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .await
            .map_err(wrap)?
            .try_collect()
            .await
            .map_err(wrap)?;

        let identities: Vec<Identity> = documents.iter().map(MongoResultDocument::identity).collect();
        let user_documents: Vec<MongoUserDocument> = self
            .user_collection()
            .await
            .find(doc! {"_id": {"$in": identities}})
            .await
            .map_err(wrap)?
            .try_collect()
            .await
            .map_err(wrap)?;

        let mut users = HashMap::with_capacity(user_documents.len());
        for document in user_documents {
            let user = UserEntity::try_from(document)?;
            users.insert(user.identity, user);
        }

        let mut rows = Vec::with_capacity(documents.len());
        for document in documents {
            let result = document.into_entity()?;
            if let Some(user) = users.get(&result.identity) {
                rows.push(LeaderboardRow::from_parts(user, &result));
            }
        }
        Ok(rows)
    }
}

impl ResultStore for MongoResultStore {
    fn upsert_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<UserEntity>> {
        let store = self.clone();
        Box::pin(async move { store.upsert_user(user).await.map_err(Into::into) })
    }

    fn find_user(&self, identity: Identity) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_user(identity).await.map_err(Into::into) })
    }

    fn submit(&self, candidate: ResultEntity) -> BoxFuture<'static, StorageResult<SubmitOutcome>> {
        let store = self.clone();
        Box::pin(async move { store.submit(candidate).await.map_err(Into::into) })
    }

    fn leaderboard(
        &self,
        board: Board,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<LeaderboardRow>>> {
        let store = self.clone();
        Box::pin(async move { store.leaderboard(board, limit).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
