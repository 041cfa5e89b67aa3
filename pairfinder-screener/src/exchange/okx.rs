//! OKX adapter for SWAP (perpetual) market data.
//!
//! # Endpoints
//! - `GET /api/v5/market/tickers?instType=SWAP`
//! - `GET /api/v5/market/candles?instId=..&bar=1D&limit=..`
//!
//! Responses use `{"code": "0", "msg": "", "data": [...]}`. Candle rows are
//! `[ts, o, h, l, c, vol, volCcy, volCcyQuote, confirm]`, newest first.

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

/// OKX public API base URL
pub const OKX_API_BASE: &str = "https://www.okx.com";

const TICKERS_ENDPOINT: &str = "/api/v5/market/tickers";
const CANDLES_ENDPOINT: &str = "/api/v5/market/candles";

/// Market data endpoints allow 20 requests per 2 seconds.
const DEFAULT_RATE_LIMIT_RPM: u32 = 600;

/// `/market/candles` returns at most 300 rows per page
const MAX_CANDLE_LIMIT: u32 = 300;

/// OKX perpetual swaps adapter.
pub struct OkxAdapter {
    rest: RestClient,
}

impl OkxAdapter {
    pub fn new() -> Self {
        Self::with_base_url(OKX_API_BASE)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self::with_settings(base_url, DEFAULT_RATE_LIMIT_RPM, Duration::from_secs(15))
    }

    pub fn with_settings(base_url: impl Into<String>, rate_limit_rpm: u32, timeout: Duration) -> Self {
        let limiter = shared_limiter("okx", rate_limit_rpm);
        Self {
            rest: RestClient::new(ExchangeId::Okx, base_url, timeout, limiter),
        }
    }

    pub fn from_config(config: &ExchangeEndpointConfig) -> Self {
        Self::with_settings(
            config.base_url.clone().unwrap_or_else(|| OKX_API_BASE.to_string()),
            config.rate_limit_rpm.unwrap_or(DEFAULT_RATE_LIMIT_RPM),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        self.rest.base_url()
    }

    fn check_envelope<T>(response: OkxResponse<T>) -> Result<Vec<T>, FetchError> {
        match response.code.as_str() {
            "0" => Ok(response.data),
            "50011" => Err(FetchError::RateLimited { retry_after_secs: None }),
            code => Err(FetchError::Api {
                code: code.to_string(),
                message: response.msg,
            }),
        }
    }
}

impl Default for OkxAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExchangeAdapter for OkxAdapter {
    fn id(&self) -> ExchangeId {
        ExchangeId::Okx
    }

    async fn fetch_tickers(&self) -> Result<Vec<RawTicker>, FetchError> {
        let response: OkxResponse<Value> = self
            .rest
            .get_json(TICKERS_ENDPOINT, &[("instType", "SWAP".to_string())])
            .await?;

        let rows = Self::check_envelope(response)?;
        let total = rows.len();
        let tickers: Vec<RawTicker> = rows.into_iter().filter_map(OkxTicker::from_row).collect();

        debug!(total, parsed = tickers.len(), "Parsed OKX tickers");

        if tickers.is_empty() {
            return Err(FetchError::Empty("okx returned no swap tickers".into()));
        }
        Ok(tickers)
    }

    async fn fetch_daily_candles(
        &self,
        symbol: &str,
        days: u32,
    ) -> Result<Vec<CandleBar>, FetchError> {
        check_candle_request(symbol, days)?;

        let response: OkxResponse<Value> = self
            .rest
            .get_json(
                CANDLES_ENDPOINT,
                &[
                    ("instId", symbol.to_string()),
                    ("bar", "1D".to_string()),
                    ("limit", days.min(MAX_CANDLE_LIMIT).to_string()),
                ],
            )
            .await?;

        let rows = Self::check_envelope(response)?;
        let bars: Vec<CandleBar> = rows.iter().filter_map(|row| parse_candle_row(row)).collect();

        if bars.is_empty() {
            return Err(FetchError::Empty(format!("no okx candles for {}", symbol)));
        }
        Ok(normalize_candles(bars, days))
    }
}

fn parse_candle_row(row: &Value) -> Option<CandleBar> {
    let row = row.as_array()?;
    if row.len() < 7 {
        return None;
    }
    let field = |i: usize| row.get(i).and_then(json_decimal);
    let close = field(4)?;

    Some(CandleBar {
        open_time: row.first().and_then(json_millis)?,
        open: field(1)?,
        high: field(2)?,
        low: field(3)?,
        close,
        // `vol` (index 5) counts contracts and is never used as volume.
        volume: field(7).or_else(|| field(6).map(|ccy| ccy * close))?,
    })
}

#[derive(Debug, Deserialize)]
struct OkxResponse<T> {
    code: String,
    #[serde(default)]
    msg: String,
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OkxTicker {
    #[serde(default)]
    inst_id: String,
    #[serde(default, deserialize_with = "lenient_decimal")]
    last: Option<f64>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    open24h: Option<f64>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    high24h: Option<f64>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    low24h: Option<f64>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    vol_ccy24h: Option<f64>,
    #[serde(default, rename = "volCcyQuote24h", deserialize_with = "lenient_decimal")]
    vol_ccy_quote24h: Option<f64>,
    #[serde(default, rename = "volUsd24h", deserialize_with = "lenient_decimal")]
    vol_usd24h: Option<f64>,
}

impl OkxTicker {
    /// Rows that do not decode are dropped individually.
    fn from_row(row: Value) -> Option<RawTicker> {
        serde_json::from_value::<Self>(row).ok()?.normalize()
    }

    fn normalize(self) -> Option<RawTicker> {
        let last = self.last?;
        let inst_id = self.inst_id.trim();
        if inst_id.is_empty() || last <= 0.0 {
            return None;
        }

        let open = self.open24h.unwrap_or(0.0);
        let change_24h_pct = if open > 0.0 {
            (last - open) / open * 100.0
        } else {
            0.0
        };

        // volCcy24h is base currency for SWAP; convert to quote.
        let volume_24h = self
            .vol_usd24h
            .or(self.vol_ccy_quote24h)
            .or_else(|| self.vol_ccy24h.map(|base| base * last))
            .unwrap_or(0.0);

        Some(RawTicker {
            symbol: inst_id.to_string(),
            exchange: ExchangeId::Okx,
            last_price: last,
            high_24h: self.high24h.unwrap_or(last),
            low_24h: self.low24h.unwrap_or(last),
            volume_24h,
            change_24h_pct,
        })
    }
}
