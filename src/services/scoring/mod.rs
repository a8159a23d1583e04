pub mod collaborative;
pub mod content;
pub mod rule;
pub mod sequence;

use crate::models::{Movie, ScoreRecord, ScoreSource, UserProfile};
use crate::utils;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use collaborative::CollaborativeScorer;
pub use content::ContentScorer;
pub use rule::RuleScorer;
pub use sequence::SequenceScorer;

/// One scoring strategy. Every implementation returns one record per
/// scored candidate with `score` in [0, 1]; a strategy that cannot score a
/// candidate simply omits it and fusion fills the slot with zero.
#[async_trait]
pub trait ScoringStrategy: Send + Sync {
    async fn score(
        &self,
        profile: &UserProfile,
        candidates: &[Movie],
        now: DateTime<Utc>,
    ) -> Result<Vec<ScoreRecord>>;

    fn name(&self) -> &'static str;
}

/// Cold-start path shared by all strategies: rank candidates by intrinsic
/// popularity, tagged with the strategy's cold source.
pub fn popularity_fallback(candidates: &[Movie], source: ScoreSource) -> Vec<ScoreRecord> {
    candidates
        .iter()
        .map(|movie| ScoreRecord {
            item_id: movie.id,
            movie: movie.clone(),
            score: utils::popularity_score(movie).clamp(0.0, 1.0),
            source,
        })
        .collect()
}
