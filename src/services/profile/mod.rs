use crate::models::{
    Action, ActionType, Preferences, RuntimePreference, UserProfile, YearPreference,
    SEQUENCE_WINDOW,
};
use crate::services::tracking::TrackingService;
use crate::utils;
use anyhow::Result;
use chrono::{DateTime, Datelike, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

const DEFAULT_RUNTIME_PREF: RuntimePreference = RuntimePreference {
    min: 70.0,
    max: 190.0,
    ideal: 120.0,
};

/// Turns the user's action history into a request-local preference model.
pub struct ProfileBuilder {
    tracking: Arc<dyn TrackingService>,
    history_limit: usize,
}

impl ProfileBuilder {
    pub fn new(tracking: Arc<dyn TrackingService>, history_limit: usize) -> Self {
        Self {
            tracking,
            history_limit,
        }
    }

    /// Builds the profile, degrading to a zero profile if the tracking
    /// backend cannot be read. Never propagates.
    pub async fn build(&self, user_id: &str) -> UserProfile {
        self.build_at(user_id, Utc::now()).await
    }

    pub async fn build_at(&self, user_id: &str, now: DateTime<Utc>) -> UserProfile {
        match self.try_build(user_id, now).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!("profile derivation for {} degraded: {}", user_id, e);
                UserProfile::degenerate(user_id)
            }
        }
    }

    async fn try_build(&self, user_id: &str, now: DateTime<Utc>) -> Result<UserProfile> {
        let all_ratings = self
            .tracking
            .get_user_actions(user_id, self.history_limit, Some(ActionType::Rate))
            .await?;
        let recent = self.tracking.get_recent_actions(user_id).await?;
        let all_actions = self
            .tracking
            .get_user_actions(user_id, self.history_limit, None)
            .await?;

        let sessions = utils::group_by_sessions(&all_actions, utils::session_timeout());
        let session_depth = sessions
            .last()
            .map(|s| (s.len() as f64 / 10.0).min(1.0))
            .unwrap_or(0.0);
        let engagement = if sessions.is_empty() {
            0.0
        } else {
            all_actions.len() as f64 / sessions.len() as f64
        };

        let values: Vec<f64> = all_ratings.iter().map(|a| a.value).collect();
        let rating_count = all_ratings.len();
        let avg_rating = if values.is_empty() {
            0.0
        } else {
            values.iter().sum::<f64>() / values.len() as f64
        };
        let rating_variance = utils::rating_variance(&values);

        // Listings are newest-first, so the oldest rating sits at the end.
        let time_active_days = all_ratings
            .last()
            .map(|a| now.signed_duration_since(a.timestamp).num_days().max(0))
            .unwrap_or(0);

        let mut recent_actions = recent;
        recent_actions.truncate(SEQUENCE_WINDOW);

        Ok(UserProfile {
            user_id: user_id.to_string(),
            rating_count,
            avg_rating,
            rating_variance,
            time_active_days,
            engagement,
            session_depth,
            recency_score: utils::recency_score(&all_actions, now),
            recent_actions,
            preferences: derive_preferences(&all_ratings, now),
        })
    }
}

/// Accumulates per-attribute rating signals into preference weights and
/// runtime/year windows.
fn derive_preferences(ratings: &[Action], now: DateTime<Utc>) -> Preferences {
    let mut genre_acc = AttributeAccumulator::default();
    let mut director_acc = AttributeAccumulator::default();
    let mut actor_acc = AttributeAccumulator::default();

    let mut runtime_weight = 0.0;
    let mut runtime_weighted_sum = 0.0;
    let mut year_weight = 0.0;
    let mut year_weighted_sum = 0.0;

    for rating in ratings {
        let signal = utils::rating_signal(rating.value);
        let Some(meta) = &rating.metadata else {
            continue;
        };

        genre_acc.add_all(&meta.genres, signal);
        director_acc.add_all(&meta.directors, signal);
        actor_acc.add_all(&meta.actors, signal);

        // Window preferences follow only positively-rated items.
        if signal > 0.0 {
            if let Some(runtime) = meta.runtime {
                runtime_weight += signal;
                runtime_weighted_sum += runtime as f64 * signal;
            }
            if let Some(year) = meta.release_year {
                year_weight += signal;
                year_weighted_sum += year as f64 * signal;
            }
        }
    }

    let runtime = if runtime_weight > 0.0 {
        let ideal = runtime_weighted_sum / runtime_weight;
        Some(RuntimePreference {
            min: (ideal - 40.0).max(50.0),
            max: ideal + 50.0,
            ideal,
        })
    } else {
        Some(DEFAULT_RUNTIME_PREF)
    };

    let current_year = now.year();
    let year = if year_weight > 0.0 {
        let ideal = (year_weighted_sum / year_weight).round() as i32;
        Some(YearPreference {
            min: (ideal - 15).max(1950),
            max: (ideal + 15).min(current_year),
        })
    } else {
        Some(YearPreference {
            min: 1980,
            max: current_year,
        })
    };

    Preferences {
        genres: genre_acc.into_weights(),
        directors: director_acc.into_weights(),
        actors: actor_acc.into_weights(),
        runtime,
        year,
        rating_threshold: 6.5,
    }
}

#[derive(Default)]
struct AttributeAccumulator {
    sums: HashMap<String, f64>,
    counts: HashMap<String, u32>,
}

impl AttributeAccumulator {
    fn add_all(&mut self, attributes: &[String], signal: f64) {
        for attribute in attributes {
            *self.sums.entry(attribute.clone()).or_insert(0.0) += signal;
            *self.counts.entry(attribute.clone()).or_insert(0) += 1;
        }
    }

    fn into_weights(self) -> HashMap<String, f64> {
        self.sums
            .into_iter()
            .map(|(attribute, sum)| {
                let count = self.counts.get(&attribute).copied().unwrap_or(0).max(1);
                (attribute, sum / count as f64)
            })
            .collect()
    }
}
