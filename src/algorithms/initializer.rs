use rand::{Rng, SeedableRng};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Xavier-uniform draw of `size` factors from a caller-supplied seed.
pub fn xavier_uniform_seeded(seed: u64, size: usize) -> Vec<f64> {
    let limit = (6.0 / size as f64).sqrt();
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    (0..size).map(|_| rng.gen_range(-limit..limit)).collect()
}

fn seed_of(value: impl Hash) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Reproducible factors for a user id.
pub fn seeded_user_factors(user_id: &str, size: usize) -> Vec<f64> {
    xavier_uniform_seeded(seed_of(user_id), size)
}

/// Reproducible factors for an item id.
pub fn seeded_item_factors(item_id: i64, size: usize) -> Vec<f64> {
    xavier_uniform_seeded(seed_of(item_id), size)
}
