use serde::Deserialize;
use std::{env, path::PathBuf, time::Duration};

/// Which storage implementation backs the progress API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Mongo,
    Memory,
}

impl StorageBackend {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" | "inmemory" => StorageBackend::Memory,
            _ => StorageBackend::Mongo,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub storage: StorageBackend,
    pub mongo_uri: String,
    pub mongo_database: String,
    pub bcrypt_cost: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub sync_debounce_ms: u64,
    pub request_timeout_secs: u64,
    pub identity_path: PathBuf,
}

impl ClientConfig {
    pub fn sync_debounce(&self) -> Duration {
        Duration::from_millis(self.sync_debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub client: ClientConfig,
}

impl Default for Config {
    /// Local development defaults: in-memory storage, backend on port 7000.
    fn default() -> Self {
        Config {
            server: ServerConfig {
                port: 7000,
                storage: StorageBackend::Memory,
                mongo_uri: "mongodb://localhost:27017".to_string(),
                mongo_database: "codequest".to_string(),
                bcrypt_cost: bcrypt::DEFAULT_COST,
            },
            client: ClientConfig {
                api_base_url: "http://localhost:7000".to_string(),
                sync_debounce_ms: 300,
                request_timeout_secs: 5,
                identity_path: default_identity_path(),
            },
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Root .env first (two levels up), then the local one
        let skip_root_env = env::var("SKIP_ROOT_ENV").is_ok();
        if skip_root_env {
            dotenvy::dotenv().ok();
        } else if dotenvy::from_path("../../.env").is_err() {
            dotenvy::dotenv().ok();
        }

        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // config/*.toml + ENV overrides (prefix: APP_)
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let defaults = Config::default();

        // Plain env vars set by the deployer win over the profile file
        let port = env::var("PORT")
            .ok()
            .or_else(|| settings.get_int("server.port").ok().map(|p| p.to_string()))
            .map(|raw| {
                raw.parse::<u16>().map_err(|e| {
                    config::ConfigError::Message(format!("invalid server port {:?}: {}", raw, e))
                })
            })
            .transpose()?
            .unwrap_or(defaults.server.port);

        let storage = env::var("STORAGE_BACKEND")
            .or_else(|_| settings.get_string("server.storage"))
            .map(|raw| StorageBackend::parse(&raw))
            .unwrap_or(StorageBackend::Mongo);

        let mongo_uri = env::var("MONGO_URI")
            .or_else(|_| settings.get_string("database.mongo_uri"))
            .unwrap_or(defaults.server.mongo_uri);

        let mongo_database = env::var("MONGO_DATABASE")
            .or_else(|_| settings.get_string("database.mongo_database"))
            .unwrap_or(defaults.server.mongo_database);

        let bcrypt_cost = env::var("BCRYPT_COST")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .or_else(|| settings.get_int("server.bcrypt_cost").ok().map(|v| v as u32))
            .filter(|cost| (4..=31).contains(cost))
            .unwrap_or(defaults.server.bcrypt_cost);

        let api_base_url = env::var("API_BASE_URL")
            .or_else(|_| settings.get_string("client.api_base_url"))
            .unwrap_or(defaults.client.api_base_url);

        let sync_debounce_ms = env::var("SYNC_DEBOUNCE_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .or_else(|| {
                settings
                    .get_int("client.sync_debounce_ms")
                    .ok()
                    .map(|v| v.max(0) as u64)
            })
            .unwrap_or(defaults.client.sync_debounce_ms);

        let request_timeout_secs = settings
            .get_int("client.request_timeout_secs")
            .ok()
            .filter(|v| *v > 0)
            .map(|v| v as u64)
            .unwrap_or(defaults.client.request_timeout_secs);

        let identity_path = env::var("PLAYER_IDENTITY_PATH")
            .or_else(|_| settings.get_string("client.identity_path"))
            .map(PathBuf::from)
            .unwrap_or(defaults.client.identity_path);

        Ok(Config {
            server: ServerConfig {
                port,
                storage,
                mongo_uri,
                mongo_database,
                bcrypt_cost,
            },
            client: ClientConfig {
                api_base_url: api_base_url.trim_end_matches('/').to_string(),
                sync_debounce_ms,
                request_timeout_secs,
                identity_path,
            },
        })
    }
}

fn default_identity_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("codequest")
        .join("player.json")
}
