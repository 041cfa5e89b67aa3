//! Screener error types.

use thiserror::Error;

use pairfinder_common::{Error as CommonError, ValidationError};

use crate::exchange::{ExchangeId, FetchError};

/// Errors returned by a screen run.
///
/// Per-symbol and per-exchange failures are absorbed into the report; only
/// configuration errors and a total outage surface here.
#[derive(Debug, Clone, Error)]
pub enum ScreenError {
    /// Configuration rejected before any network call
    #[error("Invalid screen configuration: {0}")]
    InvalidConfig(#[from] ValidationError),

    /// Every configured exchange failed to return tickers
    #[error("All exchanges failed: {}", describe(.failures))]
    AllExchangesFailed { failures: Vec<(ExchangeId, FetchError)> },
}

fn describe(failures: &[(ExchangeId, FetchError)]) -> String {
    failures
        .iter()
        .map(|(exchange, err)| format!("{}: {}", exchange, err))
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<ScreenError> for CommonError {
    fn from(err: ScreenError) -> Self {
        match err {
            ScreenError::InvalidConfig(e) => CommonError::InvalidInput(e.to_string()),
            e @ ScreenError::AllExchangesFailed { .. } => CommonError::External(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_failed_display_lists_exchanges() {
        let err = ScreenError::AllExchangesFailed {
            failures: vec![
                (ExchangeId::Bybit, FetchError::Network("Connection failed".into())),
                (ExchangeId::Okx, FetchError::Http { status: 503, body: "down".into() }),
            ],
        };
        let text = err.to_string();
        assert!(text.contains("bybit: Network error"));
        assert!(text.contains("okx: HTTP 503"));
    }

    #[test]
    fn test_into_common_error_status() {
        let invalid: CommonError = ScreenError::InvalidConfig(ValidationError::invalid(
            "limit",
            "must be at least 1",
        ))
        .into();
        assert_eq!(invalid.status_code(), 400);

        let outage: CommonError = ScreenError::AllExchangesFailed { failures: vec![] }.into();
        assert_eq!(outage.status_code(), 502);
    }
}
