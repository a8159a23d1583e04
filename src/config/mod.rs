use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub redis: RedisConfig,
    pub tracking: TrackingConfig,
    pub model: ModelConfig,
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        format!("{}:{}", self.host, self.port).parse().unwrap()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    pub pool_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// How far back profile derivation reads into the action history.
    pub history_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub factor_dim: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub default_count: usize,
    pub default_min_score: f64,
    pub default_diversity_factor: f64,
    pub cache_ttl_seconds: u64,
    /// Whole-request deadline; `None` disables the engine timeout.
    pub request_timeout_ms: Option<u64>,
    /// When true, a failed cache write fails the request instead of being
    /// logged and swallowed.
    pub surface_cache_write_errors: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                workers: num_cpus::get(),
            },
            redis: RedisConfig {
                url: "redis://localhost:6379".to_string(),
                pool_size: 10,
            },
            tracking: TrackingConfig {
                history_limit: 1000,
            },
            model: ModelConfig { factor_dim: 64 },
            engine: EngineConfig {
                default_count: 25,
                default_min_score: 0.5,
                default_diversity_factor: 0.25,
                cache_ttl_seconds: 300,
                request_timeout_ms: None,
                surface_cache_write_errors: false,
            },
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("CINEREC"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
