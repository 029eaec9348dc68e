use std::sync::Arc;

use anyhow::Context;

use crate::config::{Config, StorageBackend};
use crate::storage::{MemoryStore, MongoStore, QuestStore};
use crate::utils::retry::{retry_async_with_config, RetryConfig};

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn QuestStore>,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store: Arc<dyn QuestStore> = match config.server.storage {
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; data is lost on restart");
                Arc::new(MemoryStore::new())
            }
            StorageBackend::Mongo => Arc::new(connect_mongo(&config).await?),
        };

        Ok(Self::with_store(config, store))
    }

    pub fn with_store(config: Config, store: Arc<dyn QuestStore>) -> Self {
        Self { config, store }
    }
}

async fn connect_mongo(config: &Config) -> anyhow::Result<MongoStore> {
    let client = mongodb::Client::with_uri_str(&config.server.mongo_uri)
        .await
        .context("Failed to create MongoDB client")?;
    let store = MongoStore::new(client.database(&config.server.mongo_database));

    tracing::info!("Attempting to reach MongoDB...");
    retry_async_with_config(RetryConfig::startup(), || store.ping())
        .await
        .context("MongoDB did not answer ping")?;

    store
        .ensure_indexes()
        .await
        .context("Failed to create MongoDB indexes")?;

    tracing::info!("MongoDB connection established successfully");
    Ok(store)
}

pub mod auth_service;
pub mod progress_service;
