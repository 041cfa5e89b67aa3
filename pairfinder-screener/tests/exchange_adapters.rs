//! Exchange adapter integration tests
//!
//! Each adapter is pointed at a wiremock server replaying exchange payloads.

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pairfinder_screener::exchange::{
    BitunixAdapter, BybitAdapter, ExchangeAdapter, ExchangeId, FetchError, OkxAdapter,
};

/// 2026-01-01T00:00:00Z
const DAY0_MS: i64 = 1_767_225_600_000;
const DAY_MS: i64 = 86_400_000;

fn ts(day: i64) -> String {
    (DAY0_MS + day * DAY_MS).to_string()
}

// ============================================================================
// Bybit
// ============================================================================

#[tokio::test]
async fn test_bybit_tickers_normalized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v5/market/tickers"))
        .and(query_param("category", "linear"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "retCode": 0,
            "retMsg": "OK",
            "result": {
                "category": "linear",
                "list": [
                    {
                        "symbol": "BTCUSDT",
                        "lastPrice": "50000",
                        "highPrice24h": "51000",
                        "lowPrice24h": "48000",
                        "turnover24h": "2500000000",
                        "volume24h": "50000",
                        "price24hPcnt": "0.025"
                    },
                    {
                        "symbol": "DEADUSDT",
                        "lastPrice": "",
                        "turnover24h": "0"
                    }
                ]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = BybitAdapter::with_base_url(server.uri());
    let tickers = adapter.fetch_tickers().await.unwrap();

    assert_eq!(tickers.len(), 1);
    let btc = &tickers[0];
    assert_eq!(btc.symbol, "BTCUSDT");
    assert_eq!(btc.exchange, ExchangeId::Bybit);
    assert_eq!(btc.last_price, 50_000.0);
    assert_eq!(btc.volume_24h, 2_500_000_000.0);
    assert!((btc.change_24h_pct - 2.5).abs() < 1e-9);
}

#[tokio::test]
async fn test_bybit_klines_sorted_oldest_first() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v5/market/kline"))
        .and(query_param("symbol", "BTCUSDT"))
        .and(query_param("interval", "D"))
        .and(query_param("limit", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "retCode": 0,
            "retMsg": "OK",
            "result": {
                "symbol": "BTCUSDT",
                "list": [
                    [ts(2), "102", "104", "101", "103", "10", "1030"],
                    [ts(1), "101", "103", "100", "102", "10", "1020"],
                    [ts(0), "100", "102", "99", "101", "10", "1010"]
                ]
            }
        })))
        .mount(&server)
        .await;

    let adapter = BybitAdapter::with_base_url(server.uri());
    let bars = adapter.fetch_daily_candles("BTCUSDT", 3).await.unwrap();

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    assert_eq!(closes, vec![101.0, 102.0, 103.0]);
    assert_eq!(bars[0].volume, 1010.0);
    assert!(bars.windows(2).all(|w| w[0].open_time < w[1].open_time));
}

#[tokio::test]
async fn test_bybit_bad_ticker_row_does_not_fail_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v5/market/tickers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "retCode": 0,
            "retMsg": "OK",
            "result": {
                "list": [
                    { "lastPrice": "1" },
                    { "symbol": 42, "lastPrice": "3" },
                    { "symbol": "BTCUSDT", "lastPrice": "2", "turnover24h": 5000000 },
                    { "symbol": "ETHUSDT", "lastPrice": 3000, "turnover24h": "9000000" }
                ]
            }
        })))
        .mount(&server)
        .await;

    let adapter = BybitAdapter::with_base_url(server.uri());
    let tickers = adapter.fetch_tickers().await.unwrap();

    let symbols: Vec<&str> = tickers.iter().map(|t| t.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["BTCUSDT", "ETHUSDT"]);
    assert_eq!(tickers[0].volume_24h, 5_000_000.0);
    assert_eq!(tickers[1].last_price, 3000.0);
}

#[tokio::test]
async fn test_bybit_error_code_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v5/market/kline"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "retCode": 10001,
            "retMsg": "params error: symbol invalid",
            "result": {}
        })))
        .mount(&server)
        .await;

    let adapter = BybitAdapter::with_base_url(server.uri());
    let err = adapter.fetch_daily_candles("NOPEUSDT", 30).await.unwrap_err();

    match err {
        FetchError::Api { code, message } => {
            assert_eq!(code, "10001");
            assert!(message.contains("symbol invalid"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_bybit_http_429_is_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v5/market/tickers"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .mount(&server)
        .await;

    let adapter = BybitAdapter::with_base_url(server.uri());
    let err = adapter.fetch_tickers().await.unwrap_err();

    assert_eq!(
        err,
        FetchError::RateLimited {
            retry_after_secs: Some(7)
        }
    );
    assert!(err.is_recoverable());
}

#[tokio::test]
async fn test_bybit_server_error_keeps_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v5/market/tickers"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream maintenance"))
        .mount(&server)
        .await;

    let adapter = BybitAdapter::with_base_url(server.uri());
    let err = adapter.fetch_tickers().await.unwrap_err();

    assert_eq!(
        err,
        FetchError::Http {
            status: 503,
            body: "upstream maintenance".into()
        }
    );
}

#[tokio::test]
async fn test_bybit_empty_list_is_empty_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v5/market/tickers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "retCode": 0,
            "retMsg": "OK",
            "result": { "list": [] }
        })))
        .mount(&server)
        .await;

    let adapter = BybitAdapter::with_base_url(server.uri());
    let err = adapter.fetch_tickers().await.unwrap_err();
    assert!(matches!(err, FetchError::Empty(_)));
}

#[tokio::test]
async fn test_bybit_invalid_json_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v5/market/tickers"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let adapter = BybitAdapter::with_base_url(server.uri());
    let err = adapter.fetch_tickers().await.unwrap_err();
    assert!(matches!(err, FetchError::Malformed(_)));
}

#[tokio::test]
async fn test_bybit_rejects_bad_candle_request_without_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let adapter = BybitAdapter::with_base_url(server.uri());
    let err = adapter.fetch_daily_candles("", 30).await.unwrap_err();
    assert!(matches!(err, FetchError::InvalidRequest(_)));

    let err = adapter.fetch_daily_candles("BTCUSDT", 0).await.unwrap_err();
    assert!(matches!(err, FetchError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_unreachable_host_is_network_error() {
    // Nothing listens on the discard port.
    let adapter = BybitAdapter::with_base_url("http://127.0.0.1:9");
    let err = adapter.fetch_tickers().await.unwrap_err();
    assert!(matches!(err, FetchError::Network(_)));
}

// ============================================================================
// OKX
// ============================================================================

#[tokio::test]
async fn test_okx_tickers_derive_change_and_volume() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v5/market/tickers"))
        .and(query_param("instType", "SWAP"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "0",
            "msg": "",
            "data": [
                {
                    "instId": "ETH-USDT-SWAP",
                    "last": "2200",
                    "open24h": "2000",
                    "high24h": "2250",
                    "low24h": "1980",
                    "volCcy24h": "10000",
                    "vol24h": "1000000"
                },
                {
                    "instId": "SOL-USDT-SWAP",
                    "last": "150",
                    "open24h": "0",
                    "high24h": "155",
                    "low24h": "140",
                    "volCcyQuote24h": "7500000"
                }
            ]
        })))
        .mount(&server)
        .await;

    let adapter = OkxAdapter::with_base_url(server.uri());
    let tickers = adapter.fetch_tickers().await.unwrap();
    assert_eq!(tickers.len(), 2);

    let eth = tickers.iter().find(|t| t.symbol == "ETH-USDT-SWAP").unwrap();
    assert_eq!(eth.exchange, ExchangeId::Okx);
    assert!((eth.change_24h_pct - 10.0).abs() < 1e-9);
    // Base-currency volume valued at the last price
    assert_eq!(eth.volume_24h, 22_000_000.0);

    let sol = tickers.iter().find(|t| t.symbol == "SOL-USDT-SWAP").unwrap();
    assert_eq!(sol.change_24h_pct, 0.0);
    assert_eq!(sol.volume_24h, 7_500_000.0);
}

#[tokio::test]
async fn test_okx_candles_use_quote_volume() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v5/market/candles"))
        .and(query_param("instId", "ETH-USDT-SWAP"))
        .and(query_param("bar", "1D"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "0",
            "msg": "",
            "data": [
                [ts(1), "2100", "2150", "2050", "2120", "500", "5", "10600", "1"],
                [ts(0), "2000", "2110", "1990", "2100", "400", "4", "8400", "1"]
            ]
        })))
        .mount(&server)
        .await;

    let adapter = OkxAdapter::with_base_url(server.uri());
    let bars = adapter.fetch_daily_candles("ETH-USDT-SWAP", 30).await.unwrap();

    assert_eq!(bars.len(), 2);
    assert_eq!(bars[0].close, 2100.0);
    assert_eq!(bars[0].volume, 8400.0);
    assert_eq!(bars[1].volume, 10_600.0);
}

#[tokio::test]
async fn test_okx_bad_ticker_row_does_not_fail_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v5/market/tickers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "0",
            "msg": "",
            "data": [
                { "last": "5", "open24h": "5" },
                { "instId": "BTC-USDT-SWAP", "last": 100000, "open24h": "95000", "volCcyQuote24h": 3000000000u64 },
                { "instId": "BAD-USDT-SWAP", "last": { "px": "1" } }
            ]
        })))
        .mount(&server)
        .await;

    let adapter = OkxAdapter::with_base_url(server.uri());
    let tickers = adapter.fetch_tickers().await.unwrap();

    assert_eq!(tickers.len(), 1);
    assert_eq!(tickers[0].symbol, "BTC-USDT-SWAP");
    assert_eq!(tickers[0].last_price, 100_000.0);
    assert_eq!(tickers[0].volume_24h, 3_000_000_000.0);
}

#[tokio::test]
async fn test_okx_candles_without_currency_volume_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v5/market/candles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "0",
            "msg": "",
            "data": [
                [ts(1), "2100", "2150", "2050", "2120", "500"],
                [ts(0), "2000", "2110", "1990", "2100", "400", "4", "8400", "1"]
            ]
        })))
        .mount(&server)
        .await;

    let adapter = OkxAdapter::with_base_url(server.uri());
    let bars = adapter.fetch_daily_candles("ETH-USDT-SWAP", 30).await.unwrap();

    assert_eq!(bars.len(), 1);
    assert_eq!(bars[0].volume, 8400.0);
}

#[tokio::test]
async fn test_okx_error_code_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v5/market/tickers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "50001",
            "msg": "Service temporarily unavailable",
            "data": []
        })))
        .mount(&server)
        .await;

    let adapter = OkxAdapter::with_base_url(server.uri());
    let err = adapter.fetch_tickers().await.unwrap_err();

    assert_eq!(
        err,
        FetchError::Api {
            code: "50001".into(),
            message: "Service temporarily unavailable".into()
        }
    );
}

#[tokio::test]
async fn test_okx_rate_limit_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v5/market/candles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "50011",
            "msg": "Too Many Requests",
            "data": []
        })))
        .mount(&server)
        .await;

    let adapter = OkxAdapter::with_base_url(server.uri());
    let err = adapter.fetch_daily_candles("BTC-USDT-SWAP", 30).await.unwrap_err();
    assert!(matches!(err, FetchError::RateLimited { .. }));
}

// ============================================================================
// Bitunix
// ============================================================================

#[tokio::test]
async fn test_bitunix_tickers_accept_numbers_and_strings() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/futures/market/tickers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "msg": "Success",
            "data": [
                {
                    "symbol": "BTCUSDT",
                    "lastPrice": "60000",
                    "open": "57600",
                    "high": "60500",
                    "low": "57000",
                    "quoteVol": "1200000000"
                },
                {
                    "symbol": "XRPUSDT",
                    "last": 0.5,
                    "open": 0.5,
                    "quoteVolume": 3000000
                },
                {
                    "symbol": "",
                    "lastPrice": "1"
                }
            ]
        })))
        .mount(&server)
        .await;

    let adapter = BitunixAdapter::with_base_url(server.uri());
    let tickers = adapter.fetch_tickers().await.unwrap();
    assert_eq!(tickers.len(), 2);

    let btc = tickers.iter().find(|t| t.symbol == "BTCUSDT").unwrap();
    assert_eq!(btc.exchange, ExchangeId::Bitunix);
    assert!((btc.change_24h_pct - 4.1666666).abs() < 1e-4);
    assert_eq!(btc.volume_24h, 1_200_000_000.0);

    let xrp = tickers.iter().find(|t| t.symbol == "XRPUSDT").unwrap();
    assert_eq!(xrp.last_price, 0.5);
    assert_eq!(xrp.volume_24h, 3_000_000.0);
}

#[tokio::test]
async fn test_bitunix_object_klines() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/futures/market/kline"))
        .and(query_param("symbol", "BTCUSDT"))
        .and(query_param("interval", "1d"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "msg": "Success",
            "data": [
                { "time": DAY0_MS + DAY_MS, "open": "101", "high": "103", "low": "100", "close": "102", "quoteVol": "2040" },
                { "time": DAY0_MS, "open": "100", "high": "102", "low": "99", "close": "101", "quoteVol": "2020" }
            ]
        })))
        .mount(&server)
        .await;

    let adapter = BitunixAdapter::with_base_url(server.uri());
    let bars = adapter.fetch_daily_candles("BTCUSDT", 30).await.unwrap();

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    assert_eq!(closes, vec![101.0, 102.0]);
    assert_eq!(bars[1].volume, 2040.0);
}

#[tokio::test]
async fn test_bitunix_error_code_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/futures/market/tickers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 10002,
            "msg": "System busy",
            "data": null
        })))
        .mount(&server)
        .await;

    let adapter = BitunixAdapter::with_base_url(server.uri());
    let err = adapter.fetch_tickers().await.unwrap_err();

    assert_eq!(
        err,
        FetchError::Api {
            code: "10002".into(),
            message: "System busy".into()
        }
    );
}

#[tokio::test]
async fn test_bitunix_null_data_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/futures/market/kline"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "msg": "Success",
            "data": null
        })))
        .mount(&server)
        .await;

    let adapter = BitunixAdapter::with_base_url(server.uri());
    let err = adapter.fetch_daily_candles("BTCUSDT", 30).await.unwrap_err();
    assert!(matches!(err, FetchError::Empty(_)));
}
