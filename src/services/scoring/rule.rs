use super::{popularity_fallback, ScoringStrategy};
use crate::models::{Movie, ScoreRecord, ScoreSource, UserProfile};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Genre weight at or above which a preference counts as a strong match.
const STRONG_GENRE_WEIGHT: f64 = 0.3;

const GENRE_RULE: f64 = 0.35;
const RATING_RULE: f64 = 0.25;
const YEAR_RULE: f64 = 0.2;
const RUNTIME_RULE: f64 = 0.2;

/// Deterministic preference matching: each satisfied rule adds a fixed
/// amount, capped at one. No stochastic inputs.
pub struct RuleScorer;

impl RuleScorer {
    pub fn new() -> Self {
        Self
    }

    fn score_movie(movie: &Movie, profile: &UserProfile) -> f64 {
        let prefs = &profile.preferences;
        let mut score = 0.0;

        let strong_genre = movie
            .genres
            .iter()
            .any(|g| prefs.genres.get(g).is_some_and(|w| *w >= STRONG_GENRE_WEIGHT));
        if strong_genre {
            score += GENRE_RULE;
        }

        if movie.average_rating >= prefs.rating_threshold {
            score += RATING_RULE;
        }

        if let Some(year) = prefs.year {
            if movie.release_year >= year.min && movie.release_year <= year.max {
                score += YEAR_RULE;
            }
        }

        if let Some(runtime) = prefs.runtime {
            let minutes = movie.runtime as f64;
            if minutes >= runtime.min && minutes <= runtime.max {
                score += RUNTIME_RULE;
            }
        }

        score.min(1.0)
    }
}

#[async_trait]
impl ScoringStrategy for RuleScorer {
    async fn score(
        &self,
        profile: &UserProfile,
        candidates: &[Movie],
        _now: DateTime<Utc>,
    ) -> Result<Vec<ScoreRecord>> {
        if profile.rating_count == 0 || profile.preferences.is_empty() {
            return Ok(popularity_fallback(candidates, ScoreSource::RuleCold));
        }

        Ok(candidates
            .iter()
            .map(|movie| ScoreRecord {
                item_id: movie.id,
                movie: movie.clone(),
                score: Self::score_movie(movie, profile),
                source: ScoreSource::Rule,
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "rule"
    }
}
