use mongodb::{bson::doc, Client, Collection, Database};
use std::time::Duration;
use tokio::time::sleep;

use crate::config::MongoConfig;
use crate::types::PostDocument;

const INITIAL_BACKOFF_MS: u64 = 500;
const MAX_BACKOFF_MS: u64 = 5000;

pub struct MongoDb {
    pub client: Client,
    pub database: Database,
    collection: String,
    users_collection: String,
}

impl MongoDb {
    pub async fn new(config: &MongoConfig) -> mongodb::error::Result<Self> {
        let client = Client::with_uri_str(&config.uri).await?;
        let database = client.database(&config.database);
        Ok(Self {
            client,
            database,
            collection: config.collection.clone(),
            users_collection: config.users_collection.clone(),
        })
    }

    pub fn posts(&self) -> Collection<PostDocument> {
        self.database.collection(&self.collection)
    }

    /// Untyped view of the same collection, used where documents may be malformed.
    pub fn raw_posts(&self) -> Collection<mongodb::bson::Document> {
        self.database.collection(&self.collection)
    }

    pub fn users_collection_name(&self) -> &str {
        &self.users_collection
    }
}

/// Connect to MongoDB with exponential backoff retry logic
pub async fn connect_with_retry(config: &MongoConfig) -> mongodb::error::Result<MongoDb> {
    let max_retries = config.connect_retries;
    let mut attempt = 0;
    let mut backoff_ms = INITIAL_BACKOFF_MS;

    loop {
        attempt += 1;

        let result = match MongoDb::new(config).await {
            // The driver connects lazily, so only a ping proves the server is reachable
            Ok(db) => verify_connection(&db).await.map(|_| db),
            Err(e) => Err(e),
        };

        match result {
            Ok(db) => return Ok(db),
            Err(e) if attempt >= max_retries => {
                log::error!("MongoDB unreachable after {} attempts: {}", attempt, e);
                return Err(e);
            }
            Err(e) => {
                log::warn!(
                    "MongoDB connection failed: {}. Retrying in {}ms (attempt {}/{})",
                    e,
                    backoff_ms,
                    attempt + 1,
                    max_retries
                );
                sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
            }
        }
    }
}

/// Verify MongoDB connection with a ping command
pub async fn verify_connection(db: &MongoDb) -> mongodb::error::Result<()> {
    db.database.run_command(doc! { "ping": 1 }).await?;
    Ok(())
}
