//! Client construction for the result store.
//!
//! Submissions run in multi-document transactions, which a standalone
//! server cannot execute. Such a deployment is refused when connecting
//! instead of failing on the first submission.

use std::time::Duration;

use mongodb::{
    Client, Database,
    bson::{Document, doc},
    options::ClientOptions,
};
use tokio::time::sleep;
use tracing::debug;

use super::error::{MongoDaoError, MongoResult};

const HELLO_ATTEMPTS: usize = 10;
const FIRST_RETRY_DELAY: Duration = Duration::from_millis(250);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Pauses between failed `hello` commands, doubling up to [`MAX_RETRY_DELAY`].
fn retry_delays() -> impl Iterator<Item = Duration> {
    std::iter::successors(Some(FIRST_RETRY_DELAY), |delay| {
        Some((*delay * 2).min(MAX_RETRY_DELAY))
    })
    .take(HELLO_ATTEMPTS - 1)
}

/// Replica set members report `setName`; a mongos router reports `msg: "isdbgrid"`.
fn supports_transactions(hello: &Document) -> bool {
    hello.contains_key("setName") || matches!(hello.get_str("msg"), Ok("isdbgrid"))
}

/// Build a client, wait for the server, and check it can run transactions.
pub async fn open_database(
    options: &ClientOptions,
    database_name: &str,
) -> MongoResult<(Client, Database)> {
    let client = Client::with_options(options.clone())
        .map_err(|source| MongoDaoError::ClientConstruction { source })?;
    let database = client.database(database_name);

    let hello = wait_for_server(&database).await?;
    if !supports_transactions(&hello) {
        return Err(MongoDaoError::StandaloneServer {
            database: database_name.to_owned(),
        });
    }
    Ok((client, database))
}

async fn wait_for_server(database: &Database) -> MongoResult<Document> {
    let mut delays = retry_delays();
    let mut attempts = 0;
    loop {
        attempts += 1;
        match database.run_command(doc! { "hello": 1 }).await {
            Ok(reply) => return Ok(reply),
            Err(source) => match delays.next() {
                Some(delay) => {
                    debug!(attempts, error = %source, "MongoDB hello failed; retrying");
                    sleep(delay).await;
                }
                None => return Err(MongoDaoError::InitialPing { attempts, source }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_delays_double_up_to_the_cap() {
        let delays: Vec<u64> = retry_delays().map(|delay| delay.as_millis() as u64).collect();
        assert_eq!(
            delays,
            vec![250, 500, 1000, 2000, 4000, 5000, 5000, 5000, 5000]
        );
    }

    #[test]
    fn replica_sets_and_routers_run_transactions() {
        assert!(supports_transactions(
            &doc! { "isWritablePrimary": true, "setName": "rs0" }
        ));
        assert!(supports_transactions(
            &doc! { "isWritablePrimary": true, "msg": "isdbgrid" }
        ));
    }

    #[test]
    fn standalone_server_is_refused() {
        assert!(!supports_transactions(&doc! { "isWritablePrimary": true }));
        assert!(!supports_transactions(&doc! { "msg": "something else" }));
    }
}
