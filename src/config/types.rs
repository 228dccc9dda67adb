use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub providers: ProvidersConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    7740
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub opensubtitles: OpenSubtitlesConfig,

    #[serde(default)]
    pub podnapisi: PodnapisiConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpenSubtitlesConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// API key issued by OpenSubtitles; the provider reports itself
    /// unavailable without one.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_opensubtitles_url")]
    pub base_url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Client-side pacing under the provider's published quota.
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
}

fn default_opensubtitles_url() -> String {
    "https://api.opensubtitles.com/api/v1".to_string()
}
fn default_user_agent() -> String {
    format!("submerge v{}", env!("CARGO_PKG_VERSION"))
}
fn default_requests_per_second() -> u32 {
    4
}

impl Default for OpenSubtitlesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            base_url: default_opensubtitles_url(),
            user_agent: default_user_agent(),
            requests_per_second: default_requests_per_second(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PodnapisiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_podnapisi_url")]
    pub base_url: String,
}

fn default_podnapisi_url() -> String {
    "https://www.podnapisi.net".to_string()
}

impl Default for PodnapisiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_podnapisi_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// TTL for merged candidate sets, in seconds. Memory-resident only.
    #[serde(default = "default_results_ttl")]
    pub results_ttl_secs: u64,

    /// TTL for resolved download links, in seconds. Deliberately shorter
    /// than the search and availability windows: minted links expire
    /// upstream.
    #[serde(default = "default_resolution_ttl")]
    pub resolution_ttl_secs: u64,

    /// TTL for durable availability summaries, in days.
    #[serde(default = "default_availability_ttl")]
    pub availability_ttl_days: u64,

    /// Backing file for the availability cache.
    #[serde(default = "default_availability_path")]
    pub availability_path: PathBuf,

    /// Interval between active eviction passes over the in-memory caches.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Interval between dirty-state flushes of the availability cache.
    #[serde(default = "default_flush_interval")]
    pub flush_interval_secs: u64,
}

fn default_results_ttl() -> u64 {
    4 * 3600
}
fn default_resolution_ttl() -> u64 {
    300
}
fn default_availability_ttl() -> u64 {
    7
}
fn default_availability_path() -> PathBuf {
    PathBuf::from("./availability.json")
}
fn default_sweep_interval() -> u64 {
    600
}
fn default_flush_interval() -> u64 {
    60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            results_ttl_secs: default_results_ttl(),
            resolution_ttl_secs: default_resolution_ttl(),
            availability_ttl_days: default_availability_ttl(),
            availability_path: default_availability_path(),
            sweep_interval_secs: default_sweep_interval(),
            flush_interval_secs: default_flush_interval(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Bounded wait for each individual provider call, in seconds.
    #[serde(default = "default_provider_timeout")]
    pub provider_timeout_secs: u64,

    /// Cooldown applied on a throttling signal that carries no
    /// server-suggested delay, in seconds.
    #[serde(default = "default_cooldown")]
    pub default_cooldown_secs: u64,

    /// Upper bound on the merged candidate set.
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Per-provider contribution cap, effective in reduced-footprint mode.
    #[serde(default = "default_per_provider_cap")]
    pub per_provider_cap: usize,

    /// Cap each provider's contribution instead of only the merged total.
    #[serde(default)]
    pub reduced_footprint: bool,
}

fn default_provider_timeout() -> u64 {
    8
}
fn default_cooldown() -> u64 {
    60
}
fn default_max_results() -> usize {
    15
}
fn default_per_provider_cap() -> usize {
    5
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider_timeout_secs: default_provider_timeout(),
            default_cooldown_secs: default_cooldown(),
            max_results: default_max_results(),
            per_provider_cap: default_per_provider_cap(),
            reduced_footprint: false,
        }
    }
}

fn default_true() -> bool {
    true
}
