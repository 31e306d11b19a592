use lazy_static::lazy_static;
use std::env;

use crate::errors::AppError;

lazy_static! {
    pub static ref IS_DEV: bool = {
        env::var("RUST_ENV").unwrap_or("development".into()) == "development"
    };
}

/// Which backend holds the posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    MongoDb,
    Memory,
}

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
    pub collection: String,
    /// Collection that owner reference ids point into.
    pub users_collection: String,
    pub connect_retries: u32,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub store: StoreKind,
    pub mongo: MongoConfig,
    /// Expected bearer token. `None` means only presence is checked.
    pub api_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests don't touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let port = get("PORT", "3001")
            .parse::<u16>()
            .map_err(|e| AppError::Config(format!("PORT must be a valid port number: {}", e)))?;

        let store = match get("POSTS_STORE", "mongodb").to_lowercase().as_str() {
            "mongodb" | "mongo" => StoreKind::MongoDb,
            "memory" => StoreKind::Memory,
            other => {
                return Err(AppError::Config(format!(
                    "POSTS_STORE must be `mongodb` or `memory`, got `{}`",
                    other
                )))
            }
        };

        let connect_retries = get("MONGODB_CONNECT_RETRIES", "10")
            .parse::<u32>()
            .map_err(|e| AppError::Config(format!("MONGODB_CONNECT_RETRIES: {}", e)))?
            .max(1);

        let api_token = lookup("API_TOKEN")
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        Ok(Config {
            host: get("HOST", "0.0.0.0"),
            port,
            store,
            mongo: MongoConfig {
                uri: get("MONGODB_URI", "mongodb://localhost:27017"),
                database: get("MONGODB_DATABASE", "residency"),
                collection: get("MONGODB_COLLECTION", "posts"),
                users_collection: get("MONGODB_USERS_COLLECTION", "users"),
                connect_retries,
            },
            api_token,
        })
    }
}

/// Shared with the bearer extractor through `web::Data`.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    pub api_token: Option<String>,
}

impl From<&Config> for AuthConfig {
    fn from(config: &Config) -> Self {
        AuthConfig {
            api_token: config.api_token.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, AppError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 3001);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.store, StoreKind::MongoDb);
        assert_eq!(config.mongo.uri, "mongodb://localhost:27017");
        assert_eq!(config.mongo.collection, "posts");
        assert_eq!(config.mongo.users_collection, "users");
        assert_eq!(config.mongo.connect_retries, 10);
        assert!(config.api_token.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("POSTS_STORE", "Memory"),
            ("API_TOKEN", "  s3cret "),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.store, StoreKind::Memory);
        assert_eq!(config.api_token.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_blank_token_means_presence_only() {
        let config = config_from(&[("API_TOKEN", "   ")]).unwrap();
        assert!(config.api_token.is_none());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(config_from(&[("PORT", "abc")]), Err(AppError::Config(_))));
        assert!(matches!(
            config_from(&[("POSTS_STORE", "redis")]),
            Err(AppError::Config(_))
        ));
    }
}
