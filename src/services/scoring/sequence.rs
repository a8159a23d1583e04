use super::{popularity_fallback, ScoringStrategy};
use crate::models::{Action, ActionType, Movie, ScoreRecord, ScoreSource, UserProfile};
use crate::utils;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

const GENRE_WEIGHT: f64 = 0.5;
const DIRECTOR_WEIGHT: f64 = 0.3;
const ACTOR_WEIGHT: f64 = 0.2;

/// Score assigned to every candidate when the recent window carries no
/// usable weight at all.
const NO_SIGNAL_SCORE: f64 = 0.4;

/// Attribute affinities accumulated from the recent action window, each
/// entry bounded by `total_weight`.
#[derive(Debug, Default)]
struct SessionSignals {
    genres: HashMap<String, f64>,
    directors: HashMap<String, f64>,
    actors: HashMap<String, f64>,
    total_weight: f64,
}

fn action_type_boost(action: &Action) -> f64 {
    match action.action_type {
        ActionType::WatchTime => (action.value / 60.0).min(1.2),
        ActionType::Rate => action.value / 10.0,
        ActionType::AddWatchlist => 0.7,
        ActionType::View => 0.5,
        ActionType::Click => 0.4,
    }
}

fn build_signals(recent: &[Action], now: DateTime<Utc>) -> SessionSignals {
    let mut signals = SessionSignals::default();

    for (index, action) in recent.iter().enumerate() {
        let hours = utils::hours_since(action.timestamp, now);
        let recency_weight =
            utils::half_life_decay(hours) * (1.0 - (index as f64 / 40.0).min(0.3));
        let weight = recency_weight * action_type_boost(action);

        if let Some(meta) = &action.metadata {
            for genre in &meta.genres {
                *signals.genres.entry(genre.clone()).or_insert(0.0) += weight;
            }
            for director in &meta.directors {
                *signals.directors.entry(director.clone()).or_insert(0.0) += weight;
            }
            for actor in &meta.actors {
                *signals.actors.entry(actor.clone()).or_insert(0.0) += weight;
            }
        }
        signals.total_weight += weight;
    }

    signals
}

enum Reduction {
    Mean,
    Max,
}

/// Share of total session weight attached to the item's attributes.
fn affinity(
    attributes: &[String],
    signal_map: &HashMap<String, f64>,
    total_weight: f64,
    reduction: Reduction,
) -> f64 {
    if attributes.is_empty() {
        return 0.0;
    }

    let shares = attributes
        .iter()
        .map(|a| signal_map.get(a).copied().unwrap_or(0.0) / total_weight);

    match reduction {
        Reduction::Mean => shares.sum::<f64>() / attributes.len() as f64,
        Reduction::Max => shares.fold(0.0, f64::max),
    }
}

/// Scores candidates against the short-term taste expressed by the most
/// recent action window.
pub struct SequenceScorer;

impl SequenceScorer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ScoringStrategy for SequenceScorer {
    async fn score(
        &self,
        profile: &UserProfile,
        candidates: &[Movie],
        now: DateTime<Utc>,
    ) -> Result<Vec<ScoreRecord>> {
        if profile.recent_actions.is_empty() {
            return Ok(popularity_fallback(candidates, ScoreSource::SequenceCold));
        }

        let signals = build_signals(&profile.recent_actions, now);

        Ok(candidates
            .iter()
            .map(|movie| {
                let score = if signals.total_weight <= 0.0 {
                    NO_SIGNAL_SCORE
                } else {
                    let combined = GENRE_WEIGHT
                        * affinity(&movie.genres, &signals.genres, signals.total_weight, Reduction::Mean)
                        + DIRECTOR_WEIGHT
                            * affinity(
                                &movie.directors,
                                &signals.directors,
                                signals.total_weight,
                                Reduction::Max,
                            )
                        + ACTOR_WEIGHT
                            * affinity(&movie.actors, &signals.actors, signals.total_weight, Reduction::Mean);
                    utils::normalize(combined * 10.0)
                };

                ScoreRecord {
                    item_id: movie.id,
                    movie: movie.clone(),
                    score,
                    source: ScoreSource::Sequence,
                }
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "sequence"
    }
}
