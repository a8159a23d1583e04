use super::{popularity_fallback, ScoringStrategy};
use crate::algorithms::MatrixFactorization;
use crate::models::{Movie, ScoreRecord, ScoreSource, UserProfile};
use crate::services::tracking::{TrackingService, UserSimilarity};
use crate::utils;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Scores candidates from the latent-factor model, falling back to
/// user-based collaborative filtering and finally to popularity when no
/// behavioral signal exists.
pub struct CollaborativeScorer {
    model: Arc<dyn MatrixFactorization>,
    similarity: Arc<dyn UserSimilarity>,
    tracking: Arc<dyn TrackingService>,
}

impl CollaborativeScorer {
    pub fn new(
        model: Arc<dyn MatrixFactorization>,
        similarity: Arc<dyn UserSimilarity>,
        tracking: Arc<dyn TrackingService>,
    ) -> Self {
        Self {
            model,
            similarity,
            tracking,
        }
    }

    async fn user_based_cf(
        &self,
        user_id: &str,
        candidates: &[Movie],
    ) -> Result<Vec<ScoreRecord>> {
        let neighbors = match self.similarity.find_similar_users(user_id).await {
            Ok(neighbors) => neighbors,
            Err(e) => {
                warn!("similar-user lookup for {} failed: {}", user_id, e);
                Vec::new()
            }
        };

        if neighbors.is_empty() {
            return Ok(popularity_fallback(candidates, ScoreSource::CollaborativeCold));
        }

        let mut records = Vec::with_capacity(candidates.len());
        for movie in candidates {
            let mut weighted_sum = 0.0;
            let mut similarity_sum = 0.0;

            for neighbor in &neighbors {
                let rating = self
                    .tracking
                    .get_user_item_rating(&neighbor.user_id, movie.id)
                    .await
                    .unwrap_or(None);
                if let Some(value) = rating {
                    weighted_sum += value * neighbor.similarity;
                    similarity_sum += neighbor.similarity;
                }
            }

            let score = if similarity_sum > 0.0 {
                utils::normalize(weighted_sum / similarity_sum)
            } else {
                0.0
            };

            records.push(ScoreRecord {
                item_id: movie.id,
                movie: movie.clone(),
                score,
                source: ScoreSource::CollaborativeUser,
            });
        }

        Ok(records)
    }
}

#[async_trait]
impl ScoringStrategy for CollaborativeScorer {
    async fn score(
        &self,
        profile: &UserProfile,
        candidates: &[Movie],
        _now: DateTime<Utc>,
    ) -> Result<Vec<ScoreRecord>> {
        let item_ids: Vec<i64> = candidates.iter().map(|m| m.id).collect();

        let predictions = match self.model.predict(&profile.user_id, &item_ids).await {
            Ok(predictions) => predictions,
            Err(e) => {
                warn!("matrix prediction for {} failed: {}", profile.user_id, e);
                Vec::new()
            }
        };

        if predictions.is_empty() {
            return self.user_based_cf(&profile.user_id, candidates).await;
        }

        let by_id: HashMap<i64, &Movie> = candidates.iter().map(|m| (m.id, m)).collect();
        Ok(predictions
            .into_iter()
            .filter_map(|prediction| {
                by_id.get(&prediction.item_id).map(|movie| ScoreRecord {
                    item_id: prediction.item_id,
                    movie: (*movie).clone(),
                    score: utils::normalize(prediction.score),
                    source: ScoreSource::CollaborativeMatrix,
                })
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "collaborative"
    }
}
