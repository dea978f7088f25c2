use mongodb::options::ClientOptions;

use super::error::{MongoDaoError, MongoResult};

const DEFAULT_URI: &str = "mongodb://localhost:27017";
const DEFAULT_DB: &str = "fpv_leaderboard";

/// Connection settings for the MongoDB result store.
///
/// The deployment must be a replica set: replacing a personal best runs in a transaction.
#[derive(Clone)]
pub struct MongoConfig {
    pub options: ClientOptions,
    pub database_name: String,
}

impl MongoConfig {
    /// Parse `uri`; the database defaults to `fpv_leaderboard`.
    pub async fn from_uri(uri: &str, db_name: Option<&str>) -> MongoResult<Self> {
        let database_name = db_name.unwrap_or(DEFAULT_DB).to_owned();
        let options =
            ClientOptions::parse(uri)
                .await
                .map_err(|source| MongoDaoError::InvalidUri {
                    uri: uri.to_owned(),
                    source,
                })?;

        Ok(Self {
            options,
            database_name,
        })
    }

    /// Read `MONGO_URI` (local server when unset) and `MONGO_DB`.
    pub async fn from_env() -> MongoResult<Self> {
        let uri = std::env::var("MONGO_URI").ok();
        let db = std::env::var("MONGO_DB").ok();
        Self::from_settings(uri.as_deref(), db.as_deref()).await
    }

    async fn from_settings(uri: Option<&str>, db_name: Option<&str>) -> MongoResult<Self> {
        Self::from_uri(uri.unwrap_or(DEFAULT_URI), db_name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unset_variables_target_the_local_server() {
        let config = MongoConfig::from_settings(None, None).await.unwrap();
        assert_eq!(config.database_name, DEFAULT_DB);
        assert_eq!(config.options.hosts.len(), 1);
        assert_eq!(config.options.hosts[0].to_string(), "localhost:27017");
    }

    #[tokio::test]
    async fn explicit_settings_win() {
        let config = MongoConfig::from_settings(Some("mongodb://db.club:27018"), Some("club"))
            .await
            .unwrap();
        assert_eq!(config.database_name, "club");
        assert_eq!(config.options.hosts[0].to_string(), "db.club:27018");
    }

    #[tokio::test]
    async fn malformed_uri_is_reported() {
        let err = MongoConfig::from_uri("postgres://nope", None).await.err().unwrap();
        assert!(matches!(err, MongoDaoError::InvalidUri { .. }));
    }
}
