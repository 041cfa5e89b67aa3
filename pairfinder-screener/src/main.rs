//! Pairfinder Screener - futures pair performance screening service.
//!
//! Serves ranked perpetual futures pairs from Bybit, OKX and Bitunix over HTTP.

use anyhow::{Context, Result};
use pairfinder_common::config::Config;
use pairfinder_common::logging::init_logging;
use pairfinder_common::Validate;
use pairfinder_screener::ScreenerService;

#[tokio::main]
async fn main() -> Result<()> {
    let startup_start = std::time::Instant::now();

    // Load configuration
    let config = Config::load_with_env()?;
    config.validate().context("Invalid configuration")?;

    // Initialize logging
    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    tracing::info!("Pairfinder Screener v{}", env!("CARGO_PKG_VERSION"));

    let service = ScreenerService::new(config)?;

    let startup_duration = startup_start.elapsed();
    tracing::info!(
        duration_ms = startup_duration.as_millis() as u64,
        "Service initialized in {:?}",
        startup_duration
    );

    service.start().await
}
