//! Screen configuration.
//!
//! [`ScreenConfig`] is the typed, per-call request; [`EngineSettings`] holds
//! the process-wide knobs of the orchestrator. Both can be derived from the
//! `screener` section of the service configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use pairfinder_common::{ScreenerConfig, Validate, ValidationError, ValidationResult};

use crate::exchange::ExchangeId;

// ============================================================================
// Sort Key
// ============================================================================

/// Field the result is ranked by (always descending).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Composite performance score
    #[default]
    Performance,
    /// 24h percent change
    #[serde(rename = "change_24h")]
    Change24h,
    /// 30d percent change
    #[serde(rename = "change_30d")]
    Change30d,
    /// 24h quote volume
    Volume,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Performance => "performance",
            Self::Change24h => "change_24h",
            Self::Change30d => "change_30d",
            Self::Volume => "volume",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "performance" | "score" => Ok(Self::Performance),
            "change_24h" | "change24h" => Ok(Self::Change24h),
            "change_30d" | "change30d" => Ok(Self::Change30d),
            "volume" => Ok(Self::Volume),
            other => Err(format!("unknown sort key '{}'", other)),
        }
    }
}

// ============================================================================
// Screen Config
// ============================================================================

/// Upper bound on the deadline of a single run.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Parameters of one screen run.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenConfig {
    /// Exchanges to query, duplicates ignored
    pub exchanges: Vec<ExchangeId>,
    /// Minimum 24h quote volume for a symbol to be considered
    pub min_volume: f64,
    /// Symbols deep-fetched per exchange (highest volume first)
    pub max_candidates: usize,
    pub sort_key: SortKey,
    /// Maximum number of ranked entries returned
    pub limit: usize,
    /// Candle history window in days
    pub history_days: u32,
    /// Overall deadline; the engine default applies when unset
    pub timeout: Option<Duration>,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            exchanges: vec![ExchangeId::Bybit],
            min_volume: 1_000_000.0,
            max_candidates: 50,
            sort_key: SortKey::Performance,
            limit: 50,
            history_days: 30,
            timeout: None,
        }
    }
}

impl ScreenConfig {
    /// Config for the given exchanges with default thresholds.
    pub fn new(exchanges: impl IntoIterator<Item = ExchangeId>) -> Self {
        Self {
            exchanges: exchanges.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Build from the `screener` section of the service config.
    pub fn from_settings(settings: &ScreenerConfig) -> ValidationResult<Self> {
        let exchanges = parse_exchanges(settings.exchanges.iter().map(String::as_str))?;
        let sort_key = settings
            .sort_key
            .parse()
            .map_err(|e: String| ValidationError::invalid("screener.sort_key", e))?;

        Ok(Self {
            exchanges,
            min_volume: settings.min_volume,
            max_candidates: settings.max_candidates,
            sort_key,
            limit: settings.limit,
            history_days: settings.history_days,
            timeout: Some(Duration::from_secs(settings.timeout_secs)),
        })
    }

    pub fn with_min_volume(mut self, min_volume: f64) -> Self {
        self.min_volume = min_volume;
        self
    }

    pub fn with_max_candidates(mut self, max_candidates: usize) -> Self {
        self.max_candidates = max_candidates;
        self
    }

    pub fn with_sort_key(mut self, sort_key: SortKey) -> Self {
        self.sort_key = sort_key;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_history_days(mut self, days: u32) -> Self {
        self.history_days = days;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Deadline of the run: the configured timeout or `default`, capped at
    /// [`MAX_TIMEOUT`].
    pub fn effective_timeout(&self, default: Duration) -> Duration {
        self.timeout.unwrap_or(default).min(MAX_TIMEOUT)
    }

    /// Exchanges in request order with duplicates removed.
    pub fn unique_exchanges(&self) -> Vec<ExchangeId> {
        let mut seen = Vec::with_capacity(self.exchanges.len());
        for id in &self.exchanges {
            if !seen.contains(id) {
                seen.push(*id);
            }
        }
        seen
    }

    /// One-line description for logs and reports.
    pub fn summary(&self) -> String {
        let exchanges: Vec<&str> = self.unique_exchanges().iter().map(|e| e.as_str()).collect();
        format!(
            "exchanges={} min_volume={} max_candidates={} sort={} limit={} days={}",
            exchanges.join(","),
            self.min_volume,
            self.max_candidates,
            self.sort_key,
            self.limit,
            self.history_days
        )
    }
}

impl Validate for ScreenConfig {
    fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if self.exchanges.is_empty() {
            errors.push(ValidationError::MissingField {
                field: "exchanges".into(),
            });
        }
        if !self.min_volume.is_finite() || self.min_volume < 0.0 {
            errors.push(ValidationError::invalid(
                "min_volume",
                "must be a finite number >= 0",
            ));
        }
        if self.max_candidates == 0 {
            errors.push(ValidationError::invalid("max_candidates", "must be at least 1"));
        }
        if self.limit == 0 {
            errors.push(ValidationError::invalid("limit", "must be at least 1"));
        }
        if self.history_days == 0 {
            errors.push(ValidationError::invalid("history_days", "must be at least 1"));
        }
        if self.timeout == Some(Duration::ZERO) {
            errors.push(ValidationError::invalid("timeout", "must be greater than 0"));
        }

        ValidationError::collect(errors)
    }
}

/// Parse a list of exchange names, rejecting unknown ones.
pub fn parse_exchanges<'a>(
    names: impl IntoIterator<Item = &'a str>,
) -> ValidationResult<Vec<ExchangeId>> {
    let mut ids = Vec::new();
    let mut errors = Vec::new();

    for name in names {
        if name.trim().is_empty() {
            continue;
        }
        match name.parse::<ExchangeId>() {
            Ok(id) if !ids.contains(&id) => ids.push(id),
            Ok(_) => {}
            Err(e) => errors.push(ValidationError::invalid("exchanges", e)),
        }
    }

    ValidationError::collect(errors).map(|_| ids)
}

// ============================================================================
// Engine Settings
// ============================================================================

/// Orchestrator-wide settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    /// Concurrent candle requests per exchange
    pub concurrency: usize,
    /// Deadline used when a [`ScreenConfig`] sets none
    pub default_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            concurrency: 5,
            default_timeout: Duration::from_secs(30),
        }
    }
}

impl EngineSettings {
    pub fn from_settings(settings: &ScreenerConfig) -> Self {
        Self {
            concurrency: settings.concurrency.max(1),
            default_timeout: Duration::from_secs(settings.timeout_secs.max(1)),
        }
    }
}
