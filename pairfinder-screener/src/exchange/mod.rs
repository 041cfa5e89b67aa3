//! Exchange market data layer.
//!
//! Each supported exchange has an adapter implementing [`ExchangeAdapter`],
//! which turns the exchange's public REST payloads into the shared
//! [`RawTicker`] / [`CandleBar`] shapes. Normalization lives inside each
//! adapter; nothing downstream knows about exchange wire formats.
//!
//! # Exchanges
//! - **Bybit**: linear perpetuals, `/v5/market/*`
//! - **OKX**: SWAP instruments, `/api/v5/market/*`
//! - **Bitunix**: USDT futures, `/api/v1/futures/market/*`

mod adapter;
mod bitunix;
mod bybit;
mod http;
mod okx;
mod rate_limiter;
mod registry;

pub use adapter::{check_candle_request, ExchangeAdapter, FetchError};
pub use bitunix::BitunixAdapter;
pub use bybit::BybitAdapter;
pub use okx::OkxAdapter;
pub use rate_limiter::{shared_limiter, RateLimiter, SharedRateLimiter};
pub use registry::ExchangeRegistry;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Exchange Identifier
// ============================================================================

/// Supported exchanges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeId {
    Bybit,
    Okx,
    Bitunix,
}

impl ExchangeId {
    /// Every supported exchange, in registry order.
    pub const ALL: [ExchangeId; 3] = [Self::Bybit, Self::Okx, Self::Bitunix];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bybit => "bybit",
            Self::Okx => "okx",
            Self::Bitunix => "bitunix",
        }
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExchangeId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bybit" => Ok(Self::Bybit),
            "okx" => Ok(Self::Okx),
            "bitunix" => Ok(Self::Bitunix),
            other => Err(format!("unknown exchange '{}'", other)),
        }
    }
}

// ============================================================================
// Normalized Market Data
// ============================================================================

/// 24h ticker snapshot for one symbol on one exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTicker {
    /// Exchange-native symbol (e.g., "BTCUSDT", "BTC-USDT-SWAP")
    pub symbol: String,
    /// Exchange the ticker came from
    pub exchange: ExchangeId,
    /// Last traded price
    pub last_price: f64,
    /// 24h high
    pub high_24h: f64,
    /// 24h low
    pub low_24h: f64,
    /// 24h volume in quote currency
    pub volume_24h: f64,
    /// 24h change in percent
    pub change_24h_pct: f64,
}

/// One daily OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleBar {
    /// Bar open time
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Volume in quote currency (turnover)
    pub volume: f64,
}

impl CandleBar {
    fn is_finite(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite()
    }
}

/// Normalize a raw candle list: oldest first, one bar per open time,
/// non-finite bars dropped, clipped to the most recent `days` bars.
///
/// When an exchange repeats a timestamp, the later entry in the payload wins.
pub fn normalize_candles(mut bars: Vec<CandleBar>, days: u32) -> Vec<CandleBar> {
    bars.retain(CandleBar::is_finite);

    // Stable sort keeps payload order within equal timestamps.
    bars.sort_by_key(|b| b.open_time);

    let mut deduped: Vec<CandleBar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match deduped.last_mut() {
            Some(last) if last.open_time == bar.open_time => *last = bar,
            _ => deduped.push(bar),
        }
    }

    let keep = days as usize;
    if deduped.len() > keep {
        deduped.drain(..deduped.len() - keep);
    }
    deduped
}

/// Parse a decimal string field, treating blanks as missing.
pub(crate) fn parse_decimal(raw: Option<&str>) -> Option<f64> {
    let value: f64 = raw?.trim().parse().ok()?;
    value.is_finite().then_some(value)
}

/// Decimal carried as either a JSON string or a JSON number.
pub(crate) fn json_decimal(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_decimal(Some(s.as_str())),
        _ => None,
    }
}

/// `deserialize_with` helper for optional decimal fields. Values of the wrong
/// shape become `None` instead of failing the enclosing row.
pub(crate) fn lenient_decimal<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(json_decimal))
}

/// Millisecond epoch, as a string or a number, to UTC time.
pub(crate) fn json_millis(value: &Value) -> Option<DateTime<Utc>> {
    let millis = json_decimal(value)?;
    DateTime::from_timestamp_millis(millis as i64)
}

// ============================================================================
// Tests
// ============================================================================
