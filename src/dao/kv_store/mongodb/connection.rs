use std::time::Duration;

use mongodb::{Client, Database, bson::doc, options::ClientOptions};
use tokio::time::sleep;
use tracing::debug;

use super::error::{MongoDaoError, MongoResult};

const DEFAULT_DB: &str = "progress_board";
/// Caps how long a single ping waits for a server; the storage supervisor owns long retries.
const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(2);
const PING_ATTEMPTS: u32 = 3;
const PING_BACKOFF: Duration = Duration::from_millis(250);

/// Parsed client options plus the database holding the entries collection.
#[derive(Clone)]
pub struct MongoConfig {
    options: ClientOptions,
    database_name: String,
}

impl MongoConfig {
    /// Parse `uri` and pick `db_name`, defaulting to `progress_board`.
    pub async fn from_uri(uri: &str, db_name: Option<&str>) -> MongoResult<Self> {
        let mut options =
            ClientOptions::parse(uri)
                .await
                .map_err(|source| MongoDaoError::InvalidUri {
                    uri: uri.to_owned(),
                    source,
                })?;
        options
            .server_selection_timeout
            .get_or_insert(SERVER_SELECTION_TIMEOUT);

        Ok(Self {
            options,
            database_name: db_name.unwrap_or(DEFAULT_DB).to_owned(),
        })
    }

    /// Build a client and wait until the server answers a ping.
    pub async fn open(&self) -> MongoResult<Database> {
        let client = Client::with_options(self.options.clone())
            .map_err(|source| MongoDaoError::ClientConstruction { source })?;
        let database = client.database(&self.database_name);

        let mut attempts = 0;
        loop {
            attempts += 1;
            match database.run_command(doc! { "ping": 1 }).await {
                Ok(_) => return Ok(database),
                Err(source) if attempts >= PING_ATTEMPTS => {
                    return Err(MongoDaoError::InitialPing { attempts, source });
                }
                Err(err) => {
                    debug!(attempts, error = %err, "MongoDB ping failed; retrying");
                    sleep(PING_BACKOFF * attempts).await;
                }
            }
        }
    }
}
