use crate::config::Config;
use mongodb::{Client as MongoClient, Database};
use redis::aio::ConnectionManager;
use std::time::Duration;

const REDIS_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const REDIS_PING_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared context handed to every request handler: configuration plus the
/// two backing stores (MongoDB for puzzles/attempts/profiles, Redis for the
/// prefetch slot and rate-limit counters).
pub struct AppState {
    pub config: Config,
    pub mongo: Database,
    pub redis: ConnectionManager,
}

impl AppState {
    pub async fn new(
        config: Config,
        mongo_client: MongoClient,
        redis_client: redis::Client,
    ) -> anyhow::Result<Self> {
        let mongo = mongo_client.database(&config.mongo_database);

        tracing::info!("Connecting to Redis...");

        let redis = tokio::time::timeout(
            REDIS_CONNECT_TIMEOUT,
            ConnectionManager::new(redis_client),
        )
        .await
        .map_err(|_| anyhow::anyhow!("Redis connection timeout after 30s"))??;

        // Fail startup on a dead Redis rather than on the first request.
        let mut conn = redis.clone();
        tokio::time::timeout(
            REDIS_PING_TIMEOUT,
            redis::cmd("PING").query_async::<String>(&mut conn),
        )
        .await
        .map_err(|_| anyhow::anyhow!("Redis PING timeout after 5s"))??;

        tracing::info!("Redis connection established");

        Ok(Self {
            config,
            mongo,
            redis,
        })
    }
}

pub mod attempt_service;
pub mod profile_service;
pub mod progression;
pub mod puzzle_catalog;
pub mod puzzle_service;
pub mod rating;
pub mod review_service;
