use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

pub const TOTAL_GENERATED: &str = "recommendations.total_generated";
pub const TOTAL_ITEMS: &str = "recommendations.total_items";

/// In-process engine counters. Emission can never fail, so metrics can
/// never fail a request.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    counters: DashMap<String, u64>,
    last_avg_score: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub counters: HashMap<String, u64>,
    pub last_avg_score: f64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one generated recommendation list.
    pub fn record_generation(&self, item_count: usize, avg_score: f64) {
        self.increment(TOTAL_GENERATED, 1);
        self.increment(TOTAL_ITEMS, item_count as u64);
        self.last_avg_score
            .store(avg_score.to_bits(), Ordering::Relaxed);
    }

    pub fn increment(&self, key: &str, by: u64) {
        let mut counter = self.counters.entry(key.to_string()).or_insert(0);
        *counter += by;
    }

    pub fn counter(&self, key: &str) -> u64 {
        self.counters.get(key).map(|v| *v).unwrap_or(0)
    }

    pub fn last_avg_score(&self) -> f64 {
        f64::from_bits(self.last_avg_score.load(Ordering::Relaxed))
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            counters: self
                .counters
                .iter()
                .map(|entry| (entry.key().clone(), *entry.value()))
                .collect(),
            last_avg_score: self.last_avg_score(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_generation() {
        let metrics = EngineMetrics::new();
        metrics.record_generation(5, 0.72);
        metrics.record_generation(3, 0.65);

        assert_eq!(metrics.counter(TOTAL_GENERATED), 2);
        assert_eq!(metrics.counter(TOTAL_ITEMS), 8);
        assert!((metrics.last_avg_score() - 0.65).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_counter_is_zero() {
        let metrics = EngineMetrics::new();
        assert_eq!(metrics.counter("nope"), 0);
    }
}
