//! Per-symbol performance metrics.
//!
//! Turns one ticker and its daily candle history into a [`SymbolMetrics`]
//! record with a composite performance score:
//!
//! ```text
//! score = 0.4 * change_30d
//!       + 0.2 * change_24h
//!       + 10  * log10(max(volume_24h, 1.0) / 1_000_000)
//!       + confidence * (100 - 10 * volatility)
//!
//! volatility = |change_30d| / days
//! ```
//!
//! `confidence` is 1 whenever the window holds candles with a usable
//! reference close, even if the symbol is younger than the window. It is 0
//! for empty history, an unusable reference price or a failed candle fetch,
//! which drops the stability term entirely.
//!
//! Missing or partial history never fails the computation. The record is
//! marked [`MetricsStatus::Degraded`] instead and every numeric field stays
//! finite.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::exchange::{CandleBar, ExchangeId, FetchError, RawTicker};

// ============================================================================
// Score Weights
// ============================================================================

/// Weight of the 30d percent change.
pub const WEIGHT_CHANGE_30D: f64 = 0.4;
/// Weight of the 24h percent change.
pub const WEIGHT_CHANGE_24H: f64 = 0.2;
/// Points per decade of 24h volume above [`VOLUME_UNIT`].
pub const WEIGHT_VOLUME: f64 = 10.0;
/// Volume that contributes zero liquidity points.
pub const VOLUME_UNIT: f64 = 1_000_000.0;
/// Volume floor applied before the logarithm.
pub const VOLUME_FLOOR: f64 = 1.0;
/// Stability points of a perfectly flat symbol.
pub const STABILITY_BASE: f64 = 100.0;
/// Stability points lost per unit of volatility.
pub const VOLATILITY_PENALTY: f64 = 10.0;

/// Weights of the composite performance score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub change_30d: f64,
    pub change_24h: f64,
    pub volume: f64,
    pub volume_unit: f64,
    pub volume_floor: f64,
    pub stability_base: f64,
    pub volatility_penalty: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            change_30d: WEIGHT_CHANGE_30D,
            change_24h: WEIGHT_CHANGE_24H,
            volume: WEIGHT_VOLUME,
            volume_unit: VOLUME_UNIT,
            volume_floor: VOLUME_FLOOR,
            stability_base: STABILITY_BASE,
            volatility_penalty: VOLATILITY_PENALTY,
        }
    }
}

impl ScoreWeights {
    /// Composite score. `confidence` is clamped to `[0, 1]` and multiplies
    /// the stability term.
    pub fn score(
        &self,
        change_30d: f64,
        change_24h: f64,
        volume_24h: f64,
        volatility: f64,
        confidence: f64,
    ) -> f64 {
        let liquidity = (volume_24h.max(self.volume_floor) / self.volume_unit).log10();
        let stability = self.stability_base - self.volatility_penalty * volatility;

        self.change_30d * change_30d
            + self.change_24h * change_24h
            + self.volume * liquidity
            + confidence.clamp(0.0, 1.0) * stability
    }
}

// ============================================================================
// Metrics Status
// ============================================================================

/// Why a metrics record is less trustworthy than a full-window one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DegradedReason {
    /// Candle request failed; computed as for empty history
    CandleFetchFailed { error: String },
    /// Exchange returned no candles
    EmptyHistory,
    /// Fewer bars than the window
    PartialHistory { bars: usize, expected: u32 },
    /// Oldest close was zero or negative; 30d change set to 0
    InvalidReferencePrice,
    /// A NaN or infinite input was replaced with 0
    NonFiniteInput,
}

impl fmt::Display for DegradedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CandleFetchFailed { error } => write!(f, "candle fetch failed: {}", error),
            Self::EmptyHistory => f.write_str("empty history"),
            Self::PartialHistory { bars, expected } => {
                write!(f, "partial history ({} of {} bars)", bars, expected)
            }
            Self::InvalidReferencePrice => f.write_str("invalid reference price"),
            Self::NonFiniteInput => f.write_str("non-finite input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MetricsStatus {
    Complete,
    Degraded { reason: DegradedReason },
}

impl MetricsStatus {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

// ============================================================================
// Symbol Metrics
// ============================================================================

/// Performance metrics of one symbol on one exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolMetrics {
    pub symbol: String,
    pub exchange: ExchangeId,
    pub current_price: f64,
    /// 24h change in percent
    pub change_24h: f64,
    /// Change over the history window in percent
    pub change_30d: f64,
    pub volume_24h: f64,
    /// Sum of bar volumes over the window
    pub volume_30d: f64,
    pub high_24h: f64,
    pub low_24h: f64,
    pub high_30d: f64,
    pub low_30d: f64,
    /// Average absolute daily move over the window, in percent
    pub volatility: f64,
    pub performance_score: f64,
    /// Number of daily bars the 30d figures were computed from
    pub history_bars: usize,
    pub status: MetricsStatus,
}

impl SymbolMetrics {
    pub fn is_degraded(&self) -> bool {
        self.status.is_degraded()
    }
}

// ============================================================================
// Calculator
// ============================================================================

/// Replaces non-finite values with 0 and remembers that it did.
#[derive(Default)]
struct Sanitizer {
    clamped: bool,
}

impl Sanitizer {
    fn clean(&mut self, value: f64) -> f64 {
        if value.is_finite() {
            value
        } else {
            self.clamped = true;
            0.0
        }
    }
}

/// Computes [`SymbolMetrics`] over a fixed history window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsCalculator {
    weights: ScoreWeights,
    window_days: u32,
}

impl Default for MetricsCalculator {
    fn default() -> Self {
        Self::new(30)
    }
}

impl MetricsCalculator {
    /// Calculator over `window_days` daily bars (at least 1).
    pub fn new(window_days: u32) -> Self {
        Self {
            weights: ScoreWeights::default(),
            window_days: window_days.max(1),
        }
    }

    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn window_days(&self) -> u32 {
        self.window_days
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    /// Metrics from a ticker and its candles (oldest first).
    ///
    /// Only the most recent `window_days` bars are used.
    pub fn compute(&self, ticker: &RawTicker, candles: &[CandleBar]) -> SymbolMetrics {
        self.build(ticker, candles, None)
    }

    /// Metrics for a symbol whose candle request failed.
    pub fn compute_degraded(&self, ticker: &RawTicker, error: &FetchError) -> SymbolMetrics {
        self.build(
            ticker,
            &[],
            Some(DegradedReason::CandleFetchFailed {
                error: error.to_string(),
            }),
        )
    }

    fn build(
        &self,
        ticker: &RawTicker,
        candles: &[CandleBar],
        forced: Option<DegradedReason>,
    ) -> SymbolMetrics {
        let mut s = Sanitizer::default();
        let fetch_failed = forced.is_some();
        let days = self.window_days as f64;
        let window = &candles[candles.len().saturating_sub(self.window_days as usize)..];
        let bars = window.len();

        let current_price = s.clean(ticker.last_price);
        let change_24h = s.clean(ticker.change_24h_pct);
        let volume_24h = s.clean(ticker.volume_24h);
        let high_24h = s.clean(ticker.high_24h);
        let low_24h = s.clean(ticker.low_24h);

        let mut history_reason = None;
        let mut has_reference = false;
        let change_30d = match window.first().map(|bar| bar.close) {
            None => {
                history_reason = Some(DegradedReason::EmptyHistory);
                0.0
            }
            Some(reference) if reference.is_finite() && reference > 0.0 => {
                if bars < self.window_days as usize {
                    history_reason = Some(DegradedReason::PartialHistory {
                        bars,
                        expected: self.window_days,
                    });
                }
                has_reference = true;
                s.clean((current_price - reference) / reference * 100.0)
            }
            Some(_) => {
                history_reason = Some(DegradedReason::InvalidReferencePrice);
                0.0
            }
        };

        let mut high_30d = current_price;
        let mut low_30d = current_price;
        for bar in window {
            let high = s.clean(bar.high);
            let low = s.clean(bar.low);
            if high > high_30d {
                high_30d = high;
            }
            if low > 0.0 && low < low_30d {
                low_30d = low;
            }
        }

        let volume_30d = if window.is_empty() {
            s.clean(volume_24h * days)
        } else {
            let total: f64 = window.iter().map(|b| b.volume).sum();
            s.clean(total)
        };

        let volatility = s.clean(change_30d.abs() / days);
        let confidence = if has_reference && !fetch_failed { 1.0 } else { 0.0 };
        let performance_score = s.clean(self.weights.score(
            change_30d,
            change_24h,
            volume_24h,
            volatility,
            confidence,
        ));

        let status = match forced.or(history_reason) {
            Some(reason) => MetricsStatus::Degraded { reason },
            None if s.clamped => MetricsStatus::Degraded {
                reason: DegradedReason::NonFiniteInput,
            },
            None => MetricsStatus::Complete,
        };

        SymbolMetrics {
            symbol: ticker.symbol.clone(),
            exchange: ticker.exchange,
            current_price,
            change_24h,
            change_30d,
            volume_24h,
            volume_30d,
            high_24h,
            low_24h,
            high_30d,
            low_30d,
            volatility,
            performance_score,
            history_bars: if fetch_failed { 0 } else { bars },
            status,
        }
    }
}

/// Compute metrics with default weights over `days`.
pub fn compute_metrics(ticker: &RawTicker, candles: &[CandleBar], days: u32) -> SymbolMetrics {
    MetricsCalculator::new(days).compute(ticker, candles)
}

// ============================================================================
// Tests
// ============================================================================
