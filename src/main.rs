use actix_web::HttpServer;
use dotenv::dotenv;
use std::sync::Arc;

use residency_posts::config::IS_DEV;
use residency_posts::db::{connect_with_retry, MemoryPostStore, MongoPostStore};
use residency_posts::posts_app;
use residency_posts::{AuthConfig, Config, PostStore, StoreKind};

// -------------------- Server bootstrap --------------------
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load env
    dotenv().ok();
    // Setup logging
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    log::info!(
        "Environment: {}",
        if *IS_DEV { "development" } else { "production" }
    );

    let store: Arc<dyn PostStore> = match config.store {
        StoreKind::MongoDb => {
            log::info!(
                "Connecting to MongoDB database `{}`...",
                config.mongo.database
            );
            match connect_with_retry(&config.mongo).await {
                Ok(db) => {
                    log::info!("MongoDB connected");
                    Arc::new(MongoPostStore::new(db))
                }
                Err(e) => {
                    log::error!("Failed to connect to MongoDB: {}", e);
                    std::process::exit(1);
                }
            }
        }
        StoreKind::Memory => {
            log::warn!("Using the in-memory post store; posts are lost on restart");
            Arc::new(MemoryPostStore::new())
        }
    };

    if config.api_token.is_none() {
        log::warn!("API_TOKEN is not set; bearer tokens are only checked for presence");
    }

    let auth = AuthConfig::from(&config);
    let app_store = store.clone();

    let server = HttpServer::new(move || posts_app!(app_store.clone(), auth.clone()))
        .bind((config.host.as_str(), config.port))?;

    log::info!("Listening on http://{}:{}", config.host, config.port);

    server.run().await?;

    store.shutdown().await;
    log::info!("Server stopped");
    Ok(())
}
