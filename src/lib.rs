pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod middleware;
pub mod models;
pub mod redis_client;
pub mod services;

use std::sync::Arc;

// Shared state for the whole application.
#[derive(Clone)]
pub struct AppState {
    pub db: database::Database,
    pub broker: redis_client::RedisClient,
    pub config: config::Config,
}

impl AppState {
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let db = database::Database::new(&config.database.url, config.database.pool_size).await?;

        db.run_migrations().await?;

        let broker = redis_client::RedisClient::new(&config.broker.url).await?;

        Ok(Arc::new(Self { db, broker, config }))
    }
}
