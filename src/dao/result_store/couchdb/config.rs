use std::time::Duration;

use super::error::{CouchDaoError, CouchResult};

const DEFAULT_DATABASE: &str = "fpv_leaderboard";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings for reaching the CouchDB server that holds users and results.
#[derive(Debug, Clone)]
pub struct CouchConfig {
    pub base_url: String,
    pub database: String,
    pub credentials: Option<(String, String)>,
    /// Upper bound for a single HTTP round trip.
    pub request_timeout: Duration,
}

impl CouchConfig {
    pub fn new(base_url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            database: database.into(),
            credentials: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Attach basic-auth credentials.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    /// Read `COUCH_BASE_URL` (required), `COUCH_DB`, `COUCH_USERNAME` and `COUCH_PASSWORD`.
    pub fn from_env() -> CouchResult<Self> {
        let base_url =
            std::env::var("COUCH_BASE_URL").map_err(|_| CouchDaoError::MissingEnvVar {
                var: "COUCH_BASE_URL",
            })?;
        let database = std::env::var("COUCH_DB").unwrap_or_else(|_| DEFAULT_DATABASE.to_owned());

        let config = Self::new(base_url, database);
        match (
            std::env::var("COUCH_USERNAME").ok(),
            std::env::var("COUCH_PASSWORD").ok(),
        ) {
            (Some(username), Some(password)) => Ok(config.with_credentials(username, password)),
            _ => Ok(config),
        }
    }
}
