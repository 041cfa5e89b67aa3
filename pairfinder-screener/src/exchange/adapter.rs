//! Exchange adapter abstraction.
//!
//! Defines the `ExchangeAdapter` trait that every exchange integration
//! implements, and the `FetchError` type the orchestrator inspects to decide
//! whether to skip a symbol or an entire exchange.

use async_trait::async_trait;
use thiserror::Error;

use super::{CandleBar, ExchangeId, RawTicker};

// ============================================================================
// Fetch Error
// ============================================================================

/// Errors returned by exchange adapters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// Connection failed, timed out, or the body could not be read
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success HTTP status
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Exchange asked us to slow down
    #[error("Rate limited{}", .retry_after_secs.map(|s| format!(", retry after {} seconds", s)).unwrap_or_default())]
    RateLimited { retry_after_secs: Option<u64> },

    /// Exchange returned an error code inside a 200 response
    #[error("Exchange error {code}: {message}")]
    Api { code: String, message: String },

    /// Payload did not have the expected shape
    #[error("Malformed payload: {0}")]
    Malformed(String),

    /// Request succeeded but returned no usable rows
    #[error("Empty result: {0}")]
    Empty(String),

    /// Caller passed invalid arguments
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl FetchError {
    /// Check if the error is transient (worth retrying later).
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(_) | Self::RateLimited { .. } => true,
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Validate candle request arguments shared by every adapter.
pub fn check_candle_request(symbol: &str, days: u32) -> Result<(), FetchError> {
    if symbol.trim().is_empty() {
        return Err(FetchError::InvalidRequest("symbol must not be empty".into()));
    }
    if days == 0 {
        return Err(FetchError::InvalidRequest("days must be at least 1".into()));
    }
    Ok(())
}

// ============================================================================
// Exchange Adapter Trait
// ============================================================================

/// Market data source for one exchange.
///
/// Implementations only perform outbound HTTP calls; they hold no state
/// between calls apart from request throttling.
#[async_trait]
pub trait ExchangeAdapter: Send + Sync {
    /// Exchange this adapter serves.
    fn id(&self) -> ExchangeId;

    /// Fetch 24h tickers for every listed perpetual contract.
    ///
    /// Rows that cannot be parsed are skipped; an empty list is an error.
    async fn fetch_tickers(&self) -> Result<Vec<RawTicker>, FetchError>;

    /// Fetch daily candles for a symbol.
    ///
    /// On success the bars are oldest first, unique per open time, and at
    /// most `days` long (the most recent ones).
    async fn fetch_daily_candles(
        &self,
        symbol: &str,
        days: u32,
    ) -> Result<Vec<CandleBar>, FetchError>;
}

// ============================================================================
// Tests
// ============================================================================
