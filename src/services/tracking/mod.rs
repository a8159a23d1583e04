use crate::models::{Action, ActionType, SimilarUser};
use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Default window served by `get_recent_actions`.
const RECENT_WINDOW: usize = 50;

const MAX_SIMILAR_USERS: usize = 20;
const MIN_USER_SIMILARITY: f64 = 0.1;

/// User-action store consumed by the engine. All listings are newest-first.
#[async_trait]
pub trait TrackingService: Send + Sync {
    async fn get_user_actions(
        &self,
        user_id: &str,
        limit: usize,
        action_type: Option<ActionType>,
    ) -> Result<Vec<Action>>;

    async fn get_recent_actions(&self, user_id: &str) -> Result<Vec<Action>>;

    /// Rating one user gave one item, if any; used by the CF fallback.
    async fn get_user_item_rating(&self, user_id: &str, item_id: i64) -> Result<Option<f64>>;
}

/// Neighbor finder for the user-based CF fallback. An empty result is
/// normal and routes the collaborative scorer to its cold path.
#[async_trait]
pub trait UserSimilarity: Send + Sync {
    async fn find_similar_users(&self, user_id: &str) -> Result<Vec<SimilarUser>>;
}

/// In-process tracking store keyed by user, newest-first per user.
#[derive(Debug, Default)]
pub struct InMemoryTrackingStore {
    actions: DashMap<String, Vec<Action>>,
}

impl InMemoryTrackingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an already-validated action.
    pub fn record(&self, action: Action) {
        let mut history = self.actions.entry(action.user_id.clone()).or_default();
        let position = history
            .iter()
            .position(|existing| existing.timestamp <= action.timestamp)
            .unwrap_or(history.len());
        history.insert(position, action);
    }

    pub fn user_ids(&self) -> Vec<String> {
        self.actions.iter().map(|entry| entry.key().clone()).collect()
    }

    fn rated_items(&self, user_id: &str) -> HashMap<i64, f64> {
        let mut ratings = HashMap::new();
        if let Some(history) = self.actions.get(user_id) {
            // Newest-first listing: keep the most recent rating per item.
            for action in history.iter().filter(|a| a.action_type == ActionType::Rate) {
                ratings.entry(action.item_id).or_insert(action.value);
            }
        }
        ratings
    }
}

#[async_trait]
impl TrackingService for InMemoryTrackingStore {
    async fn get_user_actions(
        &self,
        user_id: &str,
        limit: usize,
        action_type: Option<ActionType>,
    ) -> Result<Vec<Action>> {
        let Some(history) = self.actions.get(user_id) else {
            return Ok(Vec::new());
        };

        Ok(history
            .iter()
            .filter(|a| action_type.map_or(true, |t| a.action_type == t))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get_recent_actions(&self, user_id: &str) -> Result<Vec<Action>> {
        self.get_user_actions(user_id, RECENT_WINDOW, None).await
    }

    async fn get_user_item_rating(&self, user_id: &str, item_id: i64) -> Result<Option<f64>> {
        let Some(history) = self.actions.get(user_id) else {
            return Ok(None);
        };

        Ok(history
            .iter()
            .find(|a| a.action_type == ActionType::Rate && a.item_id == item_id)
            .map(|a| a.value))
    }
}

/// Rating-overlap neighbor finder over the in-memory store. Similarity is
/// the Jaccard overlap of rated item sets, damped by rating disagreement
/// on the shared items.
pub struct RatingOverlapSimilarity {
    store: Arc<InMemoryTrackingStore>,
}

impl RatingOverlapSimilarity {
    pub fn new(store: Arc<InMemoryTrackingStore>) -> Self {
        Self { store }
    }

    fn similarity(target: &HashMap<i64, f64>, other: &HashMap<i64, f64>) -> f64 {
        let target_items: HashSet<i64> = target.keys().copied().collect();
        let other_items: HashSet<i64> = other.keys().copied().collect();
        let shared: Vec<i64> = target_items.intersection(&other_items).copied().collect();
        if shared.is_empty() {
            return 0.0;
        }

        let union = target_items.union(&other_items).count();
        let jaccard = shared.len() as f64 / union as f64;

        let disagreement: f64 = shared
            .iter()
            .map(|item| (target[item] - other[item]).abs() / 10.0)
            .sum::<f64>()
            / shared.len() as f64;

        jaccard * (1.0 - disagreement)
    }
}

#[async_trait]
impl UserSimilarity for RatingOverlapSimilarity {
    async fn find_similar_users(&self, user_id: &str) -> Result<Vec<SimilarUser>> {
        let target = self.store.rated_items(user_id);
        if target.is_empty() {
            return Ok(Vec::new());
        }

        let mut neighbors: Vec<SimilarUser> = self
            .store
            .user_ids()
            .into_iter()
            .filter(|candidate| candidate != user_id)
            .filter_map(|candidate| {
                let ratings = self.store.rated_items(&candidate);
                let similarity = Self::similarity(&target, &ratings);
                (similarity >= MIN_USER_SIMILARITY).then_some(SimilarUser {
                    user_id: candidate,
                    similarity,
                })
            })
            .collect();

        neighbors.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.user_id.cmp(&b.user_id))
        });
        neighbors.truncate(MAX_SIMILAR_USERS);

        debug!(
            "similarity scan for {} found {} neighbors",
            user_id,
            neighbors.len()
        );
        Ok(neighbors)
    }
}
