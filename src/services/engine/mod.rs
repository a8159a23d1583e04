use crate::algorithms::MatrixFactorization;
use crate::config::{EngineConfig, TrackingConfig};
use crate::error::{EngineError, EngineResult};
use crate::models::{ActionType, HybridRecord, Movie, RecommendOptions, ScoreRecord, UserProfile};
use crate::services::cache::RecommendationCache;
use crate::services::catalog::CatalogSource;
use crate::services::fusion::{self, StrategyOutputs};
use crate::services::profile::ProfileBuilder;
use crate::services::scoring::{
    CollaborativeScorer, ContentScorer, RuleScorer, ScoringStrategy, SequenceScorer,
};
use crate::services::tracking::{TrackingService, UserSimilarity};
use crate::utils::metrics::EngineMetrics;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Orchestrates one recommendation request: cache probe, profile
/// derivation, parallel strategy fan-out, fusion, diversity, ranking and
/// the cache write-back.
pub struct RecommendationEngine {
    tracking: Arc<dyn TrackingService>,
    catalog: Arc<dyn CatalogSource>,
    cache: Arc<dyn RecommendationCache>,
    profile_builder: ProfileBuilder,
    content: ContentScorer,
    collaborative: CollaborativeScorer,
    sequence: SequenceScorer,
    rule: RuleScorer,
    metrics: Arc<EngineMetrics>,
    engine_config: EngineConfig,
    history_limit: usize,
}

impl RecommendationEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tracking: Arc<dyn TrackingService>,
        catalog: Arc<dyn CatalogSource>,
        cache: Arc<dyn RecommendationCache>,
        model: Arc<dyn MatrixFactorization>,
        similarity: Arc<dyn UserSimilarity>,
        metrics: Arc<EngineMetrics>,
        engine_config: EngineConfig,
        tracking_config: TrackingConfig,
    ) -> Self {
        Self {
            profile_builder: ProfileBuilder::new(tracking.clone(), tracking_config.history_limit),
            content: ContentScorer::new(),
            collaborative: CollaborativeScorer::new(model, similarity, tracking.clone()),
            sequence: SequenceScorer::new(),
            rule: RuleScorer::new(),
            tracking,
            catalog,
            cache,
            metrics,
            engine_config,
            history_limit: tracking_config.history_limit,
        }
    }

    pub fn default_options(&self) -> RecommendOptions {
        RecommendOptions {
            count: self.engine_config.default_count,
            min_score: self.engine_config.default_min_score,
            diversity_factor: self.engine_config.default_diversity_factor,
            ..Default::default()
        }
    }

    /// Produces the ranked recommendation list for one user. Per-strategy
    /// failures are absorbed; only timeouts and orchestrator-scope
    /// failures surface.
    pub async fn recommend(
        &self,
        user_id: &str,
        options: &RecommendOptions,
    ) -> EngineResult<Vec<HybridRecord>> {
        let cache_key = cache_key(user_id, options);
        if let Some(cached) = self.read_cache(&cache_key).await {
            info!("served {} from cache", cache_key);
            return Ok(cached);
        }

        match self.engine_config.request_timeout_ms {
            Some(ms) => tokio::time::timeout(
                Duration::from_millis(ms),
                self.generate(user_id, options, &cache_key),
            )
            .await
            .map_err(|_| EngineError::Timeout)?,
            None => self.generate(user_id, options, &cache_key).await,
        }
    }

    async fn generate(
        &self,
        user_id: &str,
        options: &RecommendOptions,
        cache_key: &str,
    ) -> EngineResult<Vec<HybridRecord>> {
        let profile = self.profile_builder.build(user_id).await;
        let weights = fusion::weight_policy(&profile);

        let candidates = self.fetch_candidates(user_id, options).await;
        if candidates.is_empty() {
            info!("no candidates for {}, returning empty list", user_id);
            return Ok(Vec::new());
        }

        let now = Utc::now();
        let (content, collaborative, sequence, rule) = tokio::join!(
            self.run_scorer(&self.content, &profile, &candidates, now),
            self.run_scorer(&self.collaborative, &profile, &candidates, now),
            self.run_scorer(&self.sequence, &profile, &candidates, now),
            self.run_scorer(&self.rule, &profile, &candidates, now),
        );

        let mut records = fusion::fuse(
            StrategyOutputs {
                content,
                collaborative,
                sequence,
                rule,
            },
            weights,
            options.include_explanations,
        );
        fusion::apply_diversity(&mut records, options.diversity_factor);
        let ranked = fusion::rank(records, options.min_score, options.count);

        self.write_cache(cache_key, &ranked).await?;

        let avg_score = if ranked.is_empty() {
            0.0
        } else {
            ranked.iter().map(|r| r.score).sum::<f64>() / ranked.len() as f64
        };
        self.metrics.record_generation(ranked.len(), avg_score);

        info!(
            "generated {} recommendations for {} (avg score {:.3})",
            ranked.len(),
            user_id,
            avg_score
        );
        Ok(ranked)
    }

    async fn run_scorer<S: ScoringStrategy>(
        &self,
        scorer: &S,
        profile: &UserProfile,
        candidates: &[Movie],
        now: DateTime<Utc>,
    ) -> Vec<ScoreRecord> {
        match scorer.score(profile, candidates, now).await {
            Ok(records) => records,
            Err(e) => {
                warn!(
                    "{} scorer failed for {}, contributing nothing: {}",
                    scorer.name(),
                    profile.user_id,
                    e
                );
                Vec::new()
            }
        }
    }

    async fn fetch_candidates(&self, user_id: &str, options: &RecommendOptions) -> Vec<Movie> {
        let mut movies = match self.catalog.available_movies().await {
            Ok(movies) => movies,
            Err(e) => {
                warn!("catalog fetch failed, degrading to empty: {}", e);
                Vec::new()
            }
        };

        let rated = if options.exclude_rated {
            self.action_item_ids(user_id, ActionType::Rate).await
        } else {
            HashSet::new()
        };
        let watchlisted = if options.exclude_watchlist {
            self.action_item_ids(user_id, ActionType::AddWatchlist).await
        } else {
            HashSet::new()
        };

        movies.retain(|m| !rated.contains(&m.id) && !watchlisted.contains(&m.id));
        movies
    }

    async fn action_item_ids(&self, user_id: &str, action_type: ActionType) -> HashSet<i64> {
        match self
            .tracking
            .get_user_actions(user_id, self.history_limit, Some(action_type))
            .await
        {
            Ok(actions) => actions.into_iter().map(|a| a.item_id).collect(),
            Err(e) => {
                warn!("exclusion lookup for {} failed: {}", user_id, e);
                HashSet::new()
            }
        }
    }

    async fn read_cache(&self, key: &str) -> Option<Vec<HybridRecord>> {
        let bytes = match self.cache.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!("cache read for {} failed, treating as miss: {}", key, e);
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(records) => Some(records),
            Err(e) => {
                warn!("cache entry for {} undecodable, treating as miss: {}", key, e);
                None
            }
        }
    }

    async fn write_cache(&self, key: &str, records: &[HybridRecord]) -> EngineResult<()> {
        let bytes = serde_json::to_vec(records)
            .map_err(|e| EngineError::Internal(format!("response encoding failed: {}", e)))?;

        if let Err(e) = self
            .cache
            .setex(key, self.engine_config.cache_ttl_seconds, &bytes)
            .await
        {
            if self.engine_config.surface_cache_write_errors {
                return Err(EngineError::Internal(format!("cache write failed: {}", e)));
            }
            warn!("cache write for {} failed: {}", key, e);
        }
        Ok(())
    }
}

fn cache_key(user_id: &str, options: &RecommendOptions) -> String {
    format!("recommendations:{}:{}", user_id, options.canonical_key())
}
