//! Bybit adapter for linear perpetual market data.
//!
//! # API Documentation
//! <https://bybit-exchange.github.io/docs/v5/market/tickers>
//!
//! # Endpoints
//! - `GET /v5/market/tickers?category=linear`
//! - `GET /v5/market/kline?category=linear&symbol=..&interval=D&limit=..`
//!
//! All numeric fields arrive as strings. Kline rows are returned newest
//! first as `[start, open, high, low, close, volume, turnover]`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use pairfinder_common::ExchangeEndpointConfig;

use super::adapter::{check_candle_request, ExchangeAdapter, FetchError};
use super::http::RestClient;
use super::rate_limiter::shared_limiter;
use super::{
    json_decimal, json_millis, lenient_decimal, normalize_candles, CandleBar, ExchangeId, RawTicker,
};

// ============================================================================
// Constants
// ============================================================================

/// Bybit public API base URL
pub const BYBIT_API_BASE: &str = "https://api.bybit.com";

const TICKERS_ENDPOINT: &str = "/v5/market/tickers";
const KLINE_ENDPOINT: &str = "/v5/market/kline";

/// 600 requests per 5 seconds per IP; we stay far below that.
const DEFAULT_RATE_LIMIT_RPM: u32 = 600;

/// Kline endpoint maximum page size
const MAX_KLINE_LIMIT: u32 = 1000;

// ============================================================================
// Bybit Adapter
// ============================================================================

/// Bybit linear perpetuals adapter.
pub struct BybitAdapter {
    rest: RestClient,
}

impl BybitAdapter {
    /// Create an adapter against the public Bybit API.
    pub fn new() -> Self {
        Self::with_base_url(BYBIT_API_BASE)
    }

    /// Create an adapter against a custom base URL (testnet, proxy, mock).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self::with_settings(base_url, DEFAULT_RATE_LIMIT_RPM, Duration::from_secs(15))
    }

    /// Create with explicit rate limit and request timeout.
    pub fn with_settings(base_url: impl Into<String>, rate_limit_rpm: u32, timeout: Duration) -> Self {
        let limiter = shared_limiter("bybit", rate_limit_rpm);
        Self {
            rest: RestClient::new(ExchangeId::Bybit, base_url, timeout, limiter),
        }
    }

    /// Create from endpoint configuration.
    pub fn from_config(config: &ExchangeEndpointConfig) -> Self {
        Self::with_settings(
            config.base_url.clone().unwrap_or_else(|| BYBIT_API_BASE.to_string()),
            config.rate_limit_rpm.unwrap_or(DEFAULT_RATE_LIMIT_RPM),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        self.rest.base_url()
    }

    fn check_envelope<T>(response: BybitResponse<T>) -> Result<T, FetchError> {
        if response.ret_code != 0 {
            if response.ret_code == 10006 {
                return Err(FetchError::RateLimited { retry_after_secs: None });
            }
            return Err(FetchError::Api {
                code: response.ret_code.to_string(),
                message: response.ret_msg.unwrap_or_default(),
            });
        }
        response
            .result
            .ok_or_else(|| FetchError::Malformed("missing result".into()))
    }
}

impl Default for BybitAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExchangeAdapter for BybitAdapter {
    fn id(&self) -> ExchangeId {
        ExchangeId::Bybit
    }

    async fn fetch_tickers(&self) -> Result<Vec<RawTicker>, FetchError> {
        let response: BybitResponse<BybitList<Value>> = self
            .rest
            .get_json(TICKERS_ENDPOINT, &[("category", "linear".to_string())])
            .await?;

        let rows = Self::check_envelope(response)?.list;
        let total = rows.len();
        let tickers: Vec<RawTicker> = rows.into_iter().filter_map(BybitTicker::from_row).collect();

        debug!(total, parsed = tickers.len(), "Parsed Bybit tickers");

        if tickers.is_empty() {
            return Err(FetchError::Empty("bybit returned no linear tickers".into()));
        }
        Ok(tickers)
    }

    async fn fetch_daily_candles(
        &self,
        symbol: &str,
        days: u32,
    ) -> Result<Vec<CandleBar>, FetchError> {
        check_candle_request(symbol, days)?;

        let response: BybitResponse<BybitList<Value>> = self
            .rest
            .get_json(
                KLINE_ENDPOINT,
                &[
                    ("category", "linear".to_string()),
                    ("symbol", symbol.to_string()),
                    ("interval", "D".to_string()),
                    ("limit", days.min(MAX_KLINE_LIMIT).to_string()),
                ],
            )
            .await?;

        let rows = Self::check_envelope(response)?.list;
        let bars: Vec<CandleBar> = rows.iter().filter_map(|row| parse_kline_row(row)).collect();

        if bars.is_empty() {
            return Err(FetchError::Empty(format!("no bybit klines for {}", symbol)));
        }
        Ok(normalize_candles(bars, days))
    }
}

fn parse_kline_row(row: &Value) -> Option<CandleBar> {
    let row = row.as_array()?;
    if row.len() < 6 {
        return None;
    }
    let field = |i: usize| row.get(i).and_then(json_decimal);

    Some(CandleBar {
        open_time: row.first().and_then(json_millis)?,
        open: field(1)?,
        high: field(2)?,
        low: field(3)?,
        close: field(4)?,
        // Turnover is quote volume; fall back to base volume on short rows.
        volume: field(6).or_else(|| field(5))?,
    })
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BybitResponse<T> {
    ret_code: i64,
    #[serde(default)]
    ret_msg: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct BybitList<T> {
    #[serde(default = "Vec::new")]
    list: Vec<T>,
}

/// One ticker row. Numeric fields accept strings or numbers; a row that
/// still fails to decode is skipped on its own.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BybitTicker {
    #[serde(default)]
    symbol: String,
    #[serde(default, deserialize_with = "lenient_decimal")]
    last_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    high_price24h: Option<f64>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    low_price24h: Option<f64>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    turnover24h: Option<f64>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    volume24h: Option<f64>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    price24h_pcnt: Option<f64>,
}

impl BybitTicker {
    fn from_row(row: Value) -> Option<RawTicker> {
        serde_json::from_value::<Self>(row).ok()?.normalize()
    }

    fn normalize(self) -> Option<RawTicker> {
        let last_price = self.last_price?;
        let symbol = self.symbol.trim();
        if symbol.is_empty() || last_price <= 0.0 {
            return None;
        }

        Some(RawTicker {
            symbol: symbol.to_string(),
            exchange: ExchangeId::Bybit,
            last_price,
            high_24h: self.high_price24h.unwrap_or(last_price),
            low_24h: self.low_price24h.unwrap_or(last_price),
            volume_24h: self.turnover24h.or(self.volume24h).unwrap_or(0.0),
            change_24h_pct: self.price24h_pcnt.unwrap_or(0.0) * 100.0,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
