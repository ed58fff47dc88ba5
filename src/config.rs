//! Resolver configuration — CLI-facing defaults per spec §4.2 / §6 / §8.

use clap::Args;
use std::time::Duration;

/// Registry-client behavior: throttling, retries, and request timeout.
#[derive(Debug, Clone)]
pub struct RegistryClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
    pub min_delay_between_requests: Duration,
}

impl Default for RegistryClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://ares.gov.cz/ekonomicke-subjekty-v-be/rest".to_string(),
            timeout: Duration::from_secs(20),
            max_retries: 4,
            backoff_base: Duration::from_millis(700),
            backoff_cap: Duration::from_secs(6),
            min_delay_between_requests: Duration::from_millis(250),
        }
    }
}

/// Resolution parameters a caller supplies per spec §6.
#[derive(Debug, Clone, Args)]
pub struct ResolveConfig {
    /// Root registry ID (7 or 8 digits).
    pub root_id: String,

    /// Maximum tree depth (stride-encoded; see spec §3).
    #[arg(long, default_value_t = 25)]
    pub max_depth: u32,

    /// UBO threshold as a fraction in `[0,1]`.
    #[arg(long, default_value_t = 0.25)]
    pub threshold: f64,

    /// Path to the SQLite cache file.
    #[arg(long, default_value = "ares_vr_cache.sqlite")]
    pub cache_path: String,

    /// Bypass the cache and force a fresh fetch for every node.
    #[arg(long, default_value_t = false)]
    pub force_refresh: bool,
}
