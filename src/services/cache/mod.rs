use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use redis::AsyncCommands;
use std::time::{Duration, Instant};

/// Request-level cache behind a plain key-value contract. Entries are keyed
/// to the full `(user, options)` payload, so last-write-wins is fine.
#[async_trait]
pub trait RecommendationCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn setex(&self, key: &str, ttl_seconds: u64, value: &[u8]) -> Result<()>;
}

pub struct RedisCache {
    client: redis::Client,
}

impl RedisCache {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    pub fn from_url(url: &str) -> Result<Self> {
        Ok(Self::new(redis::Client::open(url)?))
    }
}

#[async_trait]
impl RecommendationCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    async fn setex(&self, key: &str, ttl_seconds: u64, value: &[u8]) -> Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(key, value, ttl_seconds).await?;
        Ok(())
    }
}

/// Process-local cache with the same contract, used in tests and as a
/// standalone fallback when Redis is not configured.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: DashMap<String, (Instant, Vec<u8>)>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecommendationCache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.entries.get(key) {
            Some(entry) if entry.0 > Instant::now() => Ok(Some(entry.1.clone())),
            Some(_) => {
                self.entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn setex(&self, key: &str, ttl_seconds: u64, value: &[u8]) -> Result<()> {
        let expires = Instant::now() + Duration::from_secs(ttl_seconds);
        self.entries.insert(key.to_string(), (expires, value.to_vec()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get_round_trip() {
        let cache = InMemoryCache::new();
        cache.setex("k", 60, b"payload").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(b"payload".to_vec()));
        assert_eq!(cache.get("other").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_entries_are_misses() {
        let cache = InMemoryCache::new();
        cache.setex("k", 0, b"payload").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }
}
