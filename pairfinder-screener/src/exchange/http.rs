//! Shared REST plumbing for exchange adapters.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use super::adapter::FetchError;
use super::rate_limiter::SharedRateLimiter;
use super::ExchangeId;

/// Retry hint used when a 429 carries no `Retry-After` header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 2;

/// Longest error body kept in a [`FetchError::Http`].
const MAX_ERROR_BODY: usize = 256;

/// Rate-limited JSON GET client bound to one exchange base URL.
#[derive(Debug, Clone)]
pub(crate) struct RestClient {
    exchange: ExchangeId,
    base_url: String,
    client: reqwest::Client,
    limiter: SharedRateLimiter,
}

impl RestClient {
    pub(crate) fn new(
        exchange: ExchangeId,
        base_url: impl Into<String>,
        timeout: Duration,
        limiter: SharedRateLimiter,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            exchange,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            limiter,
        }
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `path` with `query` and decode the body as `T`.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let url = format!("{}{}", self.base_url, path);

        self.limiter.acquire().await;

        debug!(exchange = %self.exchange, url = %url, ?query, "Requesting exchange endpoint");

        let response = self
            .client
            .get(&url)
            .header("accept", "application/json")
            .query(query)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
                .or(Some(DEFAULT_RETRY_AFTER_SECS));
            return Err(FetchError::RateLimited { retry_after_secs });
        }

        let body = response.text().await.map_err(map_transport_error)?;

        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
                body: truncate(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| FetchError::Malformed(e.to_string()))
    }
}

fn map_transport_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Network("Request timeout".into())
    } else if e.is_connect() {
        FetchError::Network("Connection failed".into())
    } else {
        FetchError::Network(e.to_string())
    }
}

fn truncate(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
