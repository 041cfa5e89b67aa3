//! HTTP API integration tests
//!
//! Drives the router in-process with `oneshot` against stub exchanges.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{TimeZone, Utc};
use serde_json::Value;
use tower::ServiceExt;

use pairfinder_common::Config;
use pairfinder_screener::exchange::{
    CandleBar, ExchangeAdapter, ExchangeId, ExchangeRegistry, FetchError, RawTicker,
};
use pairfinder_screener::screener::{EngineSettings, ScreenerEngine};
use pairfinder_screener::{build_router, ScreenerState};

// ============================================================================
// Helpers
// ============================================================================

struct StubAdapter {
    id: ExchangeId,
    /// (symbol, last price, 24h volume); `None` fails the ticker fetch
    tickers: Option<Vec<(&'static str, f64, f64)>>,
}

#[async_trait]
impl ExchangeAdapter for StubAdapter {
    fn id(&self) -> ExchangeId {
        self.id
    }

    async fn fetch_tickers(&self) -> Result<Vec<RawTicker>, FetchError> {
        let rows = self
            .tickers
            .as_ref()
            .ok_or_else(|| FetchError::Network("connection refused".into()))?;
        Ok(rows
            .iter()
            .map(|(symbol, price, volume)| RawTicker {
                symbol: symbol.to_string(),
                exchange: self.id,
                last_price: *price,
                high_24h: *price,
                low_24h: *price,
                volume_24h: *volume,
                change_24h_pct: 1.5,
            })
            .collect())
    }

    async fn fetch_daily_candles(
        &self,
        _symbol: &str,
        days: u32,
    ) -> Result<Vec<CandleBar>, FetchError> {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        Ok((0..days)
            .map(|i| CandleBar {
                open_time: start + chrono::Duration::days(i as i64),
                open: 100.0,
                high: 101.0,
                low: 99.0,
                close: 100.0,
                volume: 5_000_000.0,
            })
            .collect())
    }
}

/// Returns tickers but never answers a candle request.
struct StalledCandles;

#[async_trait]
impl ExchangeAdapter for StalledCandles {
    fn id(&self) -> ExchangeId {
        ExchangeId::Bybit
    }

    async fn fetch_tickers(&self) -> Result<Vec<RawTicker>, FetchError> {
        healthy_bybit().fetch_tickers().await
    }

    async fn fetch_daily_candles(
        &self,
        _symbol: &str,
        _days: u32,
    ) -> Result<Vec<CandleBar>, FetchError> {
        std::future::pending().await
    }
}

fn app(adapters: Vec<StubAdapter>) -> axum::Router {
    let adapters = adapters
        .into_iter()
        .map(|a| Arc::new(a) as Arc<dyn ExchangeAdapter>)
        .collect();
    app_with(adapters)
}

fn app_with(adapters: Vec<Arc<dyn ExchangeAdapter>>) -> axum::Router {
    let mut registry = ExchangeRegistry::new();
    for adapter in adapters {
        registry.register(adapter);
    }
    let engine = ScreenerEngine::new(
        registry,
        EngineSettings {
            concurrency: 4,
            default_timeout: Duration::from_secs(5),
        },
    );
    let state = ScreenerState::with_engine(Config::default(), engine).unwrap();
    build_router(Arc::new(state))
}

fn healthy_bybit() -> StubAdapter {
    StubAdapter {
        id: ExchangeId::Bybit,
        tickers: Some(vec![
            ("BTCUSDT", 120.0, 900_000_000.0),
            ("ETHUSDT", 104.0, 400_000_000.0),
            ("DOGEUSDT", 80.0, 50_000_000.0),
            ("TINYUSDT", 500.0, 10_000.0),
        ]),
    }
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap();
    (status, body)
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_health() {
    let (status, body) = get(app(vec![healthy_bybit()]), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "pairfinder-screener");
}

#[tokio::test]
async fn test_exchanges_lists_registered() {
    let okx = StubAdapter {
        id: ExchangeId::Okx,
        tickers: Some(vec![]),
    };
    let (status, body) = get(app(vec![okx, healthy_bybit()]), "/api/v1/exchanges").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exchanges"], serde_json::json!(["bybit", "okx"]));
    assert_eq!(body["default"], serde_json::json!(["bybit"]));
}

#[tokio::test]
async fn test_pairs_ranked_with_suggestions() {
    let (status, body) = get(app(vec![healthy_bybit()]), "/api/v1/pairs?limit=2").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["sort_key"], "performance");
    assert_eq!(body["timed_out"], false);
    // TINYUSDT is below the default volume threshold
    assert_eq!(body["total_candidates"], 3);

    let pairs = body["pairs"].as_array().unwrap();
    assert_eq!(pairs[0]["rank"], 1);
    assert_eq!(pairs[0]["symbol"], "BTCUSDT");
    assert_eq!(pairs[0]["exchange"], "bybit");
    assert_eq!(pairs[1]["rank"], 2);
    assert_eq!(pairs[1]["symbol"], "ETHUSDT");

    let settings = &pairs[0]["suggested_settings"];
    assert!(settings["leverage"].as_u64().unwrap() >= 2);
    assert!(settings["reasoning"].as_str().unwrap().contains("BTCUSDT"));
}

#[tokio::test]
async fn test_pairs_sort_by_volume() {
    let (status, body) = get(
        app(vec![healthy_bybit()]),
        "/api/v1/pairs?sort=volume&min_volume=0",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let symbols: Vec<&str> = body["pairs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["symbol"].as_str().unwrap())
        .collect();
    assert_eq!(symbols, vec!["BTCUSDT", "ETHUSDT", "DOGEUSDT", "TINYUSDT"]);
}

#[tokio::test]
async fn test_pairs_zero_limit_is_bad_request() {
    let (status, body) = get(app(vec![healthy_bybit()]), "/api/v1/pairs?limit=0").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_pairs_unknown_exchange_is_bad_request() {
    let (status, _) = get(app(vec![healthy_bybit()]), "/api/v1/pairs?exchanges=kraken").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Known but not registered
    let (status, _) = get(app(vec![healthy_bybit()]), "/api/v1/pairs?exchanges=okx").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_pairs_all_exchanges_down_is_bad_gateway() {
    let down = StubAdapter {
        id: ExchangeId::Bybit,
        tickers: None,
    };
    let (status, body) = get(app(vec![down]), "/api/v1/pairs").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "UPSTREAM_UNAVAILABLE");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("connection refused"));
}

#[tokio::test]
async fn test_pairs_partial_outage_reported() {
    let okx_down = StubAdapter {
        id: ExchangeId::Okx,
        tickers: None,
    };
    let (status, body) = get(
        app(vec![healthy_bybit(), okx_down]),
        "/api/v1/pairs?exchanges=bybit,okx",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let reports = body["exchanges"].as_array().unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0]["exchange"], "bybit");
    assert!(reports[0]["error"].is_null());
    assert_eq!(reports[1]["exchange"], "okx");
    assert!(reports[1]["error"].as_str().is_some());
    assert_eq!(reports[1]["retryable"], true);
}

#[tokio::test(start_paused = true)]
async fn test_pairs_long_timeout_returns_partial_before_request_timeout() {
    // Request timeout is 60s by default; the screen must give up first.
    let (status, body) = get(
        app_with(vec![Arc::new(StalledCandles)]),
        "/api/v1/pairs?timeout_ms=120000",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timed_out"], true);
    assert_eq!(body["exchanges"][0]["finished"], false);
    assert_eq!(body["exchanges"][0]["candidates"], 3);
}
