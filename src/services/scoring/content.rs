use super::{popularity_fallback, ScoringStrategy};
use crate::models::{Movie, RuntimePreference, ScoreRecord, ScoreSource, UserProfile, YearPreference};
use crate::utils;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

const GENRE_WEIGHT: f64 = 0.4;
const DIRECTOR_WEIGHT: f64 = 0.2;
const ACTOR_WEIGHT: f64 = 0.2;
const RUNTIME_WEIGHT: f64 = 0.1;
const YEAR_WEIGHT: f64 = 0.1;

/// Neutral sub-score when the user has no preference data for an attribute.
const NO_PREFERENCE: f64 = 0.5;
/// Slightly-below-neutral sub-score when preferences exist but the item
/// matches none of them.
const NO_MATCH: f64 = 0.45;

enum Reduction {
    Mean,
    Max,
}

/// Scores candidates by similarity between their attributes and the
/// derived preference model.
pub struct ContentScorer;

impl ContentScorer {
    pub fn new() -> Self {
        Self
    }

    fn attribute_score(
        attributes: &[String],
        preferences: &HashMap<String, f64>,
        reduction: Reduction,
    ) -> f64 {
        if preferences.is_empty() {
            return NO_PREFERENCE;
        }

        // Preference weights live in [-1, 1]; shift onto [0, 1].
        let adjusted: Vec<f64> = attributes
            .iter()
            .filter_map(|a| preferences.get(a))
            .map(|w| (w + 1.0) / 2.0)
            .collect();

        if adjusted.is_empty() {
            return NO_MATCH;
        }

        match reduction {
            Reduction::Mean => adjusted.iter().sum::<f64>() / adjusted.len() as f64,
            Reduction::Max => adjusted.iter().cloned().fold(f64::MIN, f64::max),
        }
    }

    fn runtime_score(movie: &Movie, preference: Option<RuntimePreference>) -> f64 {
        let Some(pref) = preference else {
            return NO_PREFERENCE;
        };

        let runtime = movie.runtime as f64;
        if runtime < pref.min || runtime > pref.max {
            return 0.2;
        }

        let max_side = (pref.ideal - pref.min).max(pref.max - pref.ideal);
        if max_side <= 0.0 {
            1.0
        } else {
            1.0 - (runtime - pref.ideal).abs() / max_side
        }
    }

    fn year_score(movie: &Movie, preference: Option<YearPreference>) -> f64 {
        let Some(pref) = preference else {
            return NO_PREFERENCE;
        };

        if movie.release_year < pref.min || movie.release_year > pref.max {
            0.3
        } else {
            1.0
        }
    }

    fn score_movie(movie: &Movie, profile: &UserProfile) -> f64 {
        let prefs = &profile.preferences;
        let total = GENRE_WEIGHT * Self::attribute_score(&movie.genres, &prefs.genres, Reduction::Mean)
            + DIRECTOR_WEIGHT
                * Self::attribute_score(&movie.directors, &prefs.directors, Reduction::Max)
            + ACTOR_WEIGHT * Self::attribute_score(&movie.actors, &prefs.actors, Reduction::Mean)
            + RUNTIME_WEIGHT * Self::runtime_score(movie, prefs.runtime)
            + YEAR_WEIGHT * Self::year_score(movie, prefs.year);

        utils::normalize(total * 10.0)
    }
}

#[async_trait]
impl ScoringStrategy for ContentScorer {
    async fn score(
        &self,
        profile: &UserProfile,
        candidates: &[Movie],
        _now: DateTime<Utc>,
    ) -> Result<Vec<ScoreRecord>> {
        if profile.rating_count == 0 {
            return Ok(popularity_fallback(candidates, ScoreSource::ContentCold));
        }

        Ok(candidates
            .iter()
            .map(|movie| ScoreRecord {
                item_id: movie.id,
                movie: movie.clone(),
                score: Self::score_movie(movie, profile),
                source: ScoreSource::Content,
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "content"
    }
}
