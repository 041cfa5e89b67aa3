//! Pairfinder Screener Library
//!
//! Finds the best-performing perpetual futures pairs across exchanges. For
//! each configured exchange it fetches 24h tickers, keeps the liquid ones,
//! pulls daily candles for the top candidates, computes performance metrics
//! and returns a ranked list.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                 pairfinder-screener (Rust Service)                  │
//! │                               :4480                                 │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────┐      │
//! │  │  Exchange       │  │  Screener       │  │  HTTP API       │      │
//! │  │  Adapters       │─▶│  Engine         │─▶│  /api/v1/pairs  │      │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────┘      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Concepts
//!
//! ## Performance score
//! Weighted sum of 30d change, 24h change, log-scaled 24h volume and a
//! stability term that penalizes volatility.
//!
//! ## Partial failure
//! A failed ticker fetch skips that exchange; a failed candle fetch keeps
//! the symbol with degraded metrics. Only a total outage is an error.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod error;
pub mod exchange;
pub mod routes;
pub mod screener;

pub use error::ScreenError;

use anyhow::Result;
use axum::{http::StatusCode, routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use pairfinder_common::config::Config;

use crate::screener::{ScreenConfig, ScreenerEngine};

/// Time kept between a screen deadline and the HTTP request timeout for
/// ranking and serializing the response.
const RESPONSE_HEADROOM: Duration = Duration::from_secs(1);

/// Longest screen deadline that still answers before `request_timeout`.
pub fn screen_timeout_cap(request_timeout: Duration) -> Duration {
    if request_timeout > RESPONSE_HEADROOM * 2 {
        request_timeout - RESPONSE_HEADROOM
    } else {
        request_timeout / 2
    }
}

/// Screener service state
pub struct ScreenerState {
    /// Configuration
    pub config: Config,
    /// Screen orchestrator
    pub engine: ScreenerEngine,
    /// Screen parameters used when a request leaves them out
    pub defaults: ScreenConfig,
    /// Upper bound on any screen deadline served over HTTP
    pub timeout_cap: Duration,
}

impl ScreenerState {
    /// Create state with adapters for every enabled exchange.
    pub fn new(config: Config) -> Result<Self> {
        let engine = ScreenerEngine::from_config(&config);
        Self::with_engine(config, engine)
    }

    /// Create state around an existing engine.
    pub fn with_engine(config: Config, engine: ScreenerEngine) -> Result<Self> {
        let timeout_cap =
            screen_timeout_cap(Duration::from_secs(config.service.request_timeout_secs));
        let mut defaults = ScreenConfig::from_settings(&config.screener)?;
        defaults.timeout = Some(
            defaults
                .effective_timeout(engine.settings().default_timeout)
                .min(timeout_cap),
        );
        Ok(Self {
            config,
            engine,
            defaults,
            timeout_cap,
        })
    }
}

/// Build the HTTP router.
pub fn build_router(state: Arc<ScreenerState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let request_timeout = Duration::from_secs(state.config.service.request_timeout_secs);

    Router::new()
        .route("/health", get(routes::health))
        .route("/api/v1/exchanges", get(routes::get_exchanges))
        .route("/api/v1/pairs", get(routes::get_pairs))
        .with_state(state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(cors)
}

/// Main screener service
pub struct ScreenerService {
    state: Arc<ScreenerState>,
}

impl ScreenerService {
    /// Create a new screener service
    pub fn new(config: Config) -> Result<Self> {
        let state = Arc::new(ScreenerState::new(config)?);
        Ok(Self { state })
    }

    /// Start the HTTP server and run until Ctrl-C.
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self.state.config.bind_address().parse()?;
        let app = build_router(self.state.clone());

        tracing::info!(
            address = %addr,
            exchanges = ?self.state.engine.registry().ids(),
            "Starting HTTP server"
        );

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
