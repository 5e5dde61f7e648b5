//! Store configuration.

use serde::{Deserialize, Serialize};

/// Promotion store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// JSON file with an array of promotions loaded at startup
    #[serde(default)]
    pub seed_path: Option<String>,
    /// Promotion cache TTL in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Maximum cached promotions
    #[serde(default = "default_cache_max_capacity")]
    pub cache_max_capacity: u64,
}

fn default_cache_ttl_secs() -> u64 {
    60
}

fn default_cache_max_capacity() -> u64 {
    10_000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            seed_path: None,
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_max_capacity: default_cache_max_capacity(),
        }
    }
}
