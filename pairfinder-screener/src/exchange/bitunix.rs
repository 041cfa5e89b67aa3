//! Bitunix adapter for USDT-margined futures.
//!
//! Bitunix payloads are loosely typed: numbers may arrive as strings or JSON
//! numbers, field names vary between API revisions, and kline rows may be
//! either positional arrays or keyed objects. Parsing therefore goes through
//! [`serde_json::Value`] with ordered field fallbacks.
//!
//! # Endpoints
//! - `GET /api/v1/futures/market/tickers`
//! - `GET /api/v1/futures/market/kline?symbol=..&interval=1d&limit=..`

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use pairfinder_common::ExchangeEndpointConfig;

use super::adapter::{check_candle_request, ExchangeAdapter, FetchError};
use super::http::RestClient;
use super::rate_limiter::shared_limiter;
use super::{json_decimal, json_millis, normalize_candles, CandleBar, ExchangeId, RawTicker};

/// Bitunix futures API base URL
pub const BITUNIX_API_BASE: &str = "https://fapi.bitunix.com";

const TICKERS_ENDPOINT: &str = "/api/v1/futures/market/tickers";
const KLINE_ENDPOINT: &str = "/api/v1/futures/market/kline";

const DEFAULT_RATE_LIMIT_RPM: u32 = 300;
const MAX_KLINE_LIMIT: u32 = 200;

const SYMBOL_FIELDS: &[&str] = &["symbol", "pair", "instrumentId"];
const PRICE_FIELDS: &[&str] = &["lastPrice", "last", "price", "close"];
const OPEN_FIELDS: &[&str] = &["open24h", "open", "openPrice"];
const HIGH_FIELDS: &[&str] = &["high24h", "high", "highPrice"];
const LOW_FIELDS: &[&str] = &["low24h", "low", "lowPrice"];
const VOLUME_FIELDS: &[&str] = &[
    "quoteVol",
    "quoteVolume",
    "quoteVolume24h",
    "turnover24h",
    "volume24h",
    "volume",
    "vol",
];
const TIME_FIELDS: &[&str] = &["time", "ts", "openTime", "timestamp"];

/// Bitunix futures adapter.
pub struct BitunixAdapter {
    rest: RestClient,
}

impl BitunixAdapter {
    pub fn new() -> Self {
        Self::with_base_url(BITUNIX_API_BASE)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self::with_settings(base_url, DEFAULT_RATE_LIMIT_RPM, Duration::from_secs(15))
    }

    pub fn with_settings(base_url: impl Into<String>, rate_limit_rpm: u32, timeout: Duration) -> Self {
        let limiter = shared_limiter("bitunix", rate_limit_rpm);
        Self {
            rest: RestClient::new(ExchangeId::Bitunix, base_url, timeout, limiter),
        }
    }

    pub fn from_config(config: &ExchangeEndpointConfig) -> Self {
        Self::with_settings(
            config.base_url.clone().unwrap_or_else(|| BITUNIX_API_BASE.to_string()),
            config.rate_limit_rpm.unwrap_or(DEFAULT_RATE_LIMIT_RPM),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        self.rest.base_url()
    }

    fn check_envelope(response: BitunixResponse) -> Result<Vec<Value>, FetchError> {
        if response.code != 0 {
            return Err(FetchError::Api {
                code: response.code.to_string(),
                message: response.msg,
            });
        }
        match response.data {
            Value::Array(rows) => Ok(rows),
            Value::Null => Ok(Vec::new()),
            other => Err(FetchError::Malformed(format!(
                "expected array data, got {}",
                kind(&other)
            ))),
        }
    }
}

impl Default for BitunixAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExchangeAdapter for BitunixAdapter {
    fn id(&self) -> ExchangeId {
        ExchangeId::Bitunix
    }

    async fn fetch_tickers(&self) -> Result<Vec<RawTicker>, FetchError> {
        let response: BitunixResponse = self.rest.get_json(TICKERS_ENDPOINT, &[]).await?;

        let rows = Self::check_envelope(response)?;
        let total = rows.len();
        let tickers: Vec<RawTicker> = rows.iter().filter_map(parse_ticker).collect();

        debug!(total, parsed = tickers.len(), "Parsed Bitunix tickers");

        if tickers.is_empty() {
            return Err(FetchError::Empty("bitunix returned no futures tickers".into()));
        }
        Ok(tickers)
    }

    async fn fetch_daily_candles(
        &self,
        symbol: &str,
        days: u32,
    ) -> Result<Vec<CandleBar>, FetchError> {
        check_candle_request(symbol, days)?;

        let response: BitunixResponse = self
            .rest
            .get_json(
                KLINE_ENDPOINT,
                &[
                    ("symbol", symbol.to_string()),
                    ("interval", "1d".to_string()),
                    ("limit", days.min(MAX_KLINE_LIMIT).to_string()),
                ],
            )
            .await?;

        let rows = Self::check_envelope(response)?;
        let bars: Vec<CandleBar> = rows.iter().filter_map(parse_kline).collect();

        if bars.is_empty() {
            return Err(FetchError::Empty(format!("no bitunix klines for {}", symbol)));
        }
        Ok(normalize_candles(bars, days))
    }
}

// ============================================================================
// Loose field access
// ============================================================================

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// First field in `names` that holds a number.
fn number_field(obj: &Value, names: &[&str]) -> Option<f64> {
    names.iter().find_map(|name| obj.get(*name).and_then(json_decimal))
}

fn string_field(obj: &Value, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        obj.get(*name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

fn parse_ticker(row: &Value) -> Option<RawTicker> {
    let symbol = string_field(row, SYMBOL_FIELDS)?;
    let last_price = number_field(row, PRICE_FIELDS)?;
    if last_price <= 0.0 {
        return None;
    }

    let open = number_field(row, OPEN_FIELDS).unwrap_or(last_price);
    let change_24h_pct = if open > 0.0 {
        (last_price - open) / open * 100.0
    } else {
        0.0
    };

    Some(RawTicker {
        symbol,
        exchange: ExchangeId::Bitunix,
        last_price,
        high_24h: number_field(row, HIGH_FIELDS).unwrap_or(last_price),
        low_24h: number_field(row, LOW_FIELDS).unwrap_or(last_price),
        volume_24h: number_field(row, VOLUME_FIELDS).unwrap_or(0.0),
        change_24h_pct,
    })
}

/// Kline rows come either as `[time, o, h, l, c, baseVol, quoteVol]` or as
/// objects keyed by name.
fn parse_kline(row: &Value) -> Option<CandleBar> {
    match row {
        Value::Array(cols) => {
            let col = |i: usize| cols.get(i).and_then(json_decimal);
            let close = col(4)?;
            Some(CandleBar {
                open_time: cols.first().and_then(json_millis)?,
                open: col(1)?,
                high: col(2)?,
                low: col(3)?,
                close,
                volume: col(6).or_else(|| col(5).map(|base| base * close))?,
            })
        }
        Value::Object(_) => {
            let close = number_field(row, &["close", "c"])?;
            Some(CandleBar {
                open_time: TIME_FIELDS
                    .iter()
                    .find_map(|name| row.get(*name).and_then(json_millis))?,
                open: number_field(row, &["open", "o"])?,
                high: number_field(row, &["high", "h"])?,
                low: number_field(row, &["low", "l"])?,
                close,
                volume: number_field(row, &["quoteVol", "quoteVolume", "turnover"])
                    .or_else(|| number_field(row, &["baseVol", "volume", "vol"]).map(|b| b * close))
                    .unwrap_or(0.0),
            })
        }
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct BitunixResponse {
    code: i64,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Value,
}
