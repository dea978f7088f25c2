use std::{collections::HashMap, sync::Arc};

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::from_value;

use crate::dao::{
    models::{
        Board, Identity, LeaderboardRow, ResultEntity, SubmitOutcome, UserEntity, rank_order,
    },
    result_store::{ResultStore, decide},
    storage::StorageResult,
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        AllDocsKeys, AllDocsResponse, CouchResultDocument, CouchUserDocument, END_SUFFIX,
        board_prefix, result_doc_id, user_doc_id,
    },
};

const ALL_DOCS: &str = "_all_docs";

/// CouchDB-backed [`ResultStore`].
///
/// Each quadruple maps to a single document, and replacements carry the stored `_rev`,
/// so a concurrent writer makes the second `PUT` fail with `409 Conflict`.
#[derive(Clone)]
pub struct CouchResultStore {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchResultStore {
    /// Build the HTTP client and make sure the database exists.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let store = Self {
            client,
            base_url: Arc::from(config.base_url.trim_end_matches('/')),
            database: Arc::from(config.database),
            auth: config
                .credentials
                .map(|(user, pass)| (Arc::<str>::from(user), Arc::<str>::from(pass))),
        };

        store.ensure_database().await?;
        Ok(store)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth {
            Some((ref user, ref pass)) => builder.basic_auth(user.as_ref(), Some(pass.as_ref())),
            None => builder,
        }
    }

    fn database_url(&self) -> String {
        format!("{}/{}", self.base_url, self.database)
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.database_url(), path);
        self.authorize(self.client.request(method, url))
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let url = self.database_url();

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|source| CouchDaoError::Database {
                database: database.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let create = self
                    .authorize(self.client.put(&url))
                    .send()
                    .await
                    .map_err(|source| CouchDaoError::Database {
                        database: database.clone(),
                        source,
                    })?;
                // 412 means another instance created it first.
                match create.status() {
                    status if status.is_success() => Ok(()),
                    StatusCode::PRECONDITION_FAILED => Ok(()),
                    status => Err(CouchDaoError::DatabaseStatus { database, status }),
                }
            }
            status => Err(CouchDaoError::DatabaseStatus { database, status }),
        }
    }

    async fn get_document<T>(&self, doc_id: &str) -> CouchResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::GET, doc_id)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_owned(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                response.json::<T>().await.map(Some).map_err(|source| {
                    CouchDaoError::DecodeResponse {
                        path: doc_id.to_owned(),
                        source,
                    }
                })
            }
            status => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_owned(),
                status,
            }),
        }
    }

    async fn put_document<T>(&self, doc_id: &str, document: &T) -> CouchResult<()>
    where
        T: ?Sized + Serialize,
    {
        let response = self
            .request(Method::PUT, doc_id)
            .json(document)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_owned(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CouchDaoError::write_rejected(doc_id, response.status()))
        }
    }

    async fn read_all_docs(&self, response: reqwest::Response) -> CouchResult<AllDocsResponse> {
        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                path: ALL_DOCS.to_owned(),
                status: response.status(),
            });
        }

        response
            .json::<AllDocsResponse>()
            .await
            .map_err(|source| CouchDaoError::DecodeResponse {
                path: ALL_DOCS.to_owned(),
                source,
            })
    }

    fn decode_rows<T>(payload: AllDocsResponse) -> CouchResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let mut documents = Vec::with_capacity(payload.rows.len());
        for row in payload.rows {
            if let Some(doc) = row.doc {
                let parsed = from_value(doc).map_err(|source| CouchDaoError::DeserializeValue {
                    path: row.key,
                    source,
                })?;
                documents.push(parsed);
            }
        }
        Ok(documents)
    }

    /// Range-scan every document whose id starts with `prefix`.
    async fn list_documents<T>(&self, prefix: &str) -> CouchResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let encode = |key: String| serde_json::Value::String(key).to_string();
        let query = [
            ("include_docs", "true".to_owned()),
            ("startkey", encode(prefix.to_owned())),
            ("endkey", encode(format!("{prefix}{END_SUFFIX}"))),
        ];

        let response = self
            .request(Method::GET, ALL_DOCS)
            .query(&query)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: ALL_DOCS.to_owned(),
                source,
            })?;

        Self::decode_rows(self.read_all_docs(response).await?)
    }

    /// Fetch the listed documents in one round trip; missing ids are skipped.
    async fn fetch_documents<T>(&self, keys: &[String]) -> CouchResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .request(Method::POST, ALL_DOCS)
            .query(&[("include_docs", "true")])
            .json(&AllDocsKeys { keys })
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: ALL_DOCS.to_owned(),
                source,
            })?;

        Self::decode_rows(self.read_all_docs(response).await?)
    }

    async fn upsert_user(&self, user: UserEntity) -> CouchResult<UserEntity> {
        let doc_id = user_doc_id(user.identity);
        let rev = self
            .get_document::<CouchUserDocument>(&doc_id)
            .await?
            .and_then(|existing| existing.rev);
        self.put_document(&doc_id, &CouchUserDocument::from_entity(&user, rev))
            .await?;
        Ok(user)
    }

    async fn find_user(&self, identity: Identity) -> CouchResult<Option<UserEntity>> {
        self.get_document::<CouchUserDocument>(&user_doc_id(identity))
            .await?
            .map(CouchUserDocument::into_entity)
            .transpose()
    }

    async fn submit(&self, candidate: ResultEntity) -> CouchResult<SubmitOutcome> {
        let doc_id = result_doc_id(candidate.quadruple());
        let stored = self.get_document::<CouchResultDocument>(&doc_id).await?;
        let rev = stored.as_ref().and_then(|document| document.rev.clone());

        let outcome = decide(candidate, stored.map(CouchResultDocument::into_entity));
        match &outcome {
            SubmitOutcome::Inserted(current) | SubmitOutcome::Replaced { current, .. } => {
                let document = CouchResultDocument::from_entity(current, rev);
                self.put_document(&doc_id, &document).await?;
            }
            SubmitOutcome::Rejected { .. } => {}
        }
        Ok(outcome)
    }

    async fn leaderboard(&self, board: Board, limit: usize) -> CouchResult<Vec<LeaderboardRow>> {
        let mut results: Vec<ResultEntity> = self
            .list_documents::<CouchResultDocument>(&board_prefix(board))
            .await?
            .into_iter()
            .map(CouchResultDocument::into_entity)
            .collect();
        results.sort_by(rank_order);
        results.truncate(limit);

        let keys: Vec<String> = results
            .iter()
            .map(|result| user_doc_id(result.identity))
            .collect();
        let mut users = HashMap::with_capacity(keys.len());
        for document in self.fetch_documents::<CouchUserDocument>(&keys).await? {
            let user = document.into_entity()?;
            users.insert(user.identity, user);
        }

        Ok(results
            .iter()
            .filter_map(|result| {
                users
                    .get(&result.identity)
                    .map(|user| LeaderboardRow::from_parts(user, result))
            })
            .collect())
    }

    async fn ping(&self) -> CouchResult<()> {
        let url = self.database_url();
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: url.clone(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CouchDaoError::RequestStatus {
                path: url,
                status: response.status(),
            })
        }
    }
}

impl ResultStore for CouchResultStore {
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
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}
