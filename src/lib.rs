pub mod algorithms;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use error::{EngineError, EngineResult};
pub use models::*;

use algorithms::LatentFactorModel;
use anyhow::Result;
use services::cache::{RecommendationCache, RedisCache};
use services::catalog::InMemoryCatalog;
use services::engine::RecommendationEngine;
use services::tracking::{InMemoryTrackingStore, RatingOverlapSimilarity};
use std::sync::Arc;
use utils::metrics::EngineMetrics;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub tracking: Arc<InMemoryTrackingStore>,
    pub catalog: Arc<InMemoryCatalog>,
    pub model: Arc<LatentFactorModel>,
    pub metrics: Arc<EngineMetrics>,
    pub engine: Arc<RecommendationEngine>,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self> {
        let config = Arc::new(config);

        let tracking = Arc::new(InMemoryTrackingStore::new());
        let catalog = Arc::new(InMemoryCatalog::new());
        let model = Arc::new(LatentFactorModel::new(config.model.factor_dim));
        let metrics = Arc::new(EngineMetrics::new());

        let cache: Arc<dyn RecommendationCache> =
            Arc::new(RedisCache::from_url(&config.redis.url)?);
        let similarity = Arc::new(RatingOverlapSimilarity::new(tracking.clone()));

        let engine = Arc::new(RecommendationEngine::new(
            tracking.clone(),
            catalog.clone(),
            cache,
            model.clone(),
            similarity,
            metrics.clone(),
            config.engine.clone(),
            config.tracking.clone(),
        ));

        Ok(Self {
            config,
            tracking,
            catalog,
            model,
            metrics,
            engine,
        })
    }
}

pub async fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}
