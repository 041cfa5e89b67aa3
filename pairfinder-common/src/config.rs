//! Configuration types for pair finder services.
//!
//! Configuration is read from `~/.pairfinder/config.json`. Every section
//! has defaults, so a missing file or a partial file is valid. Environment
//! variables override a few service-level fields.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the configuration directory.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".pairfinder"),
        |dirs| dirs.home_dir().join(".pairfinder"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP service settings
    #[serde(default)]
    pub service: ServiceConfig,

    /// Logging settings
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Default screen parameters
    #[serde(default)]
    pub screener: ScreenerConfig,

    /// Per-exchange endpoint settings
    #[serde(default)]
    pub exchanges: ExchangesConfig,
}

impl Config {
    /// Load configuration from the default path, falling back to defaults.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable overrides.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Unparseable values are ignored and the configured value is kept.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("PAIRFINDER_HOST") {
            self.service.host = host;
        }
        if let Some(port) = lookup("PAIRFINDER_PORT") {
            if let Ok(p) = port.parse() {
                self.service.port = p;
            }
        }
        if let Some(level) = lookup("PAIRFINDER_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Some(format) = lookup("PAIRFINDER_LOG_FORMAT") {
            self.observability.log_format = format;
        }
    }

    /// Bind address for the HTTP service.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.service.host, self.service.port)
    }
}

// ============================================================================
// Service / Observability
// ============================================================================

/// HTTP service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Bind host
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-request timeout for the HTTP layer (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

// ============================================================================
// Screener Defaults
// ============================================================================

/// Default parameters for a screen run.
///
/// Values are kept as plain strings/numbers here; the screener crate parses
/// them into its typed configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenerConfig {
    /// Exchanges screened when the caller does not choose
    #[serde(default = "default_exchanges")]
    pub exchanges: Vec<String>,

    /// Minimum 24h quote volume
    #[serde(default = "default_min_volume")]
    pub min_volume: f64,

    /// Symbols deep-fetched per exchange
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,

    /// Sort key (performance, change_24h, change_30d, volume)
    #[serde(default = "default_sort_key")]
    pub sort_key: String,

    /// Result size
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Candle history window in days
    #[serde(default = "default_history_days")]
    pub history_days: u32,

    /// Concurrent candle requests per exchange
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Overall screen deadline (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            exchanges: default_exchanges(),
            min_volume: default_min_volume(),
            max_candidates: default_max_candidates(),
            sort_key: default_sort_key(),
            limit: default_limit(),
            history_days: default_history_days(),
            concurrency: default_concurrency(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// ============================================================================
// Exchange Endpoints
// ============================================================================

/// Endpoint settings for every supported exchange.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExchangesConfig {
    #[serde(default)]
    pub bybit: ExchangeEndpointConfig,

    #[serde(default)]
    pub okx: ExchangeEndpointConfig,

    #[serde(default)]
    pub bitunix: ExchangeEndpointConfig,
}

impl ExchangesConfig {
    /// Iterate over `(name, endpoint)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ExchangeEndpointConfig)> {
        [
            ("bybit", &self.bybit),
            ("okx", &self.okx),
            ("bitunix", &self.bitunix),
        ]
        .into_iter()
    }
}

/// Endpoint settings for a single exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeEndpointConfig {
    /// Whether the adapter is registered at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Override of the public REST base URL
    #[serde(default)]
    pub base_url: Option<String>,

    /// Proactive rate limit (requests per minute); adapter default when unset
    #[serde(default)]
    pub rate_limit_rpm: Option<u32>,

    /// Per-request HTTP timeout (seconds)
    #[serde(default = "default_exchange_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ExchangeEndpointConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: None,
            rate_limit_rpm: None,
            request_timeout_secs: default_exchange_timeout_secs(),
        }
    }
}

// ============================================================================
// Defaults
// ============================================================================

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    4480
}
fn default_request_timeout_secs() -> u64 {
    60
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "pretty".into()
}
fn default_exchanges() -> Vec<String> {
    vec!["bybit".into()]
}
fn default_min_volume() -> f64 {
    1_000_000.0
}
fn default_max_candidates() -> usize {
    50
}
fn default_sort_key() -> String {
    "performance".into()
}
fn default_limit() -> usize {
    50
}
fn default_history_days() -> u32 {
    30
}
fn default_concurrency() -> usize {
    5
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_exchange_timeout_secs() -> u64 {
    15
}
fn default_true() -> bool {
    true
}

// ============================================================================
// Tests
// ============================================================================
