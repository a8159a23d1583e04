pub mod initializer;

use crate::models::Prediction;
use anyhow::Result;
use async_trait::async_trait;
use nalgebra::DVector;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Latent-factor score predictions for a `(user, item-list)` query. An
/// empty result is a valid "no prediction" signal, not an error.
#[async_trait]
pub trait MatrixFactorization: Send + Sync {
    async fn predict(&self, user_id: &str, item_ids: &[i64]) -> Result<Vec<Prediction>>;
}

/// Dot-product model over per-id factor vectors. Factors are loaded from an
/// offline trainer; this process never updates them.
pub struct LatentFactorModel {
    user_factors: RwLock<HashMap<String, DVector<f64>>>,
    item_factors: RwLock<HashMap<i64, DVector<f64>>>,
    factor_dim: usize,
}

impl LatentFactorModel {
    pub fn new(factor_dim: usize) -> Self {
        Self {
            user_factors: RwLock::new(HashMap::new()),
            item_factors: RwLock::new(HashMap::new()),
            factor_dim,
        }
    }

    pub fn factor_dim(&self) -> usize {
        self.factor_dim
    }

    pub async fn set_user_factors(&self, user_id: impl Into<String>, factors: Vec<f64>) {
        let mut users = self.user_factors.write().await;
        users.insert(user_id.into(), DVector::from_vec(factors));
    }

    pub async fn set_item_factors(&self, item_id: i64, factors: Vec<f64>) {
        let mut items = self.item_factors.write().await;
        items.insert(item_id, DVector::from_vec(factors));
    }

    /// Deterministic factors derived from the id, for fixtures and warm-up.
    pub async fn seed_user(&self, user_id: &str) {
        let factors = initializer::seeded_user_factors(user_id, self.factor_dim);
        self.set_user_factors(user_id, factors).await;
    }

    pub async fn seed_item(&self, item_id: i64) {
        let factors = initializer::seeded_item_factors(item_id, self.factor_dim);
        self.set_item_factors(item_id, factors).await;
    }

    pub async fn known_user(&self, user_id: &str) -> bool {
        self.user_factors.read().await.contains_key(user_id)
    }
}

#[async_trait]
impl MatrixFactorization for LatentFactorModel {
    async fn predict(&self, user_id: &str, item_ids: &[i64]) -> Result<Vec<Prediction>> {
        let users = self.user_factors.read().await;
        let Some(user_vec) = users.get(user_id) else {
            return Ok(Vec::new());
        };

        let items = self.item_factors.read().await;
        let predictions = item_ids
            .iter()
            .filter_map(|&item_id| {
                items
                    .get(&item_id)
                    .filter(|item_vec| item_vec.len() == user_vec.len())
                    .map(|item_vec| Prediction {
                        item_id,
                        score: user_vec.dot(item_vec),
                    })
            })
            .collect();

        Ok(predictions)
    }
}
