//! Futures Pair Screener Module.
//!
//! Scans perpetual futures markets on one or more exchanges and ranks
//! symbols by a composite performance score.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        ScreenerEngine                            │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  ┌────────────┐   ┌────────────┐   ┌────────────┐                │
//! │  │   Bybit    │   │    OKX     │   │  Bitunix   │  one task each │
//! │  │  tickers   │   │  tickers   │   │  tickers   │                │
//! │  └─────┬──────┘   └─────┬──────┘   └─────┬──────┘                │
//! │        │ liquidity pre-filter, top N by volume                   │
//! │  ┌─────▼──────────────────────────────────────────┐              │
//! │  │  candles per symbol (semaphore-bounded)        │              │
//! │  │  MetricsCalculator -> SymbolMetrics            │              │
//! │  └─────┬──────────────────────────────────────────┘              │
//! │        │ mpsc                                                    │
//! │  ┌─────▼──────┐   ┌────────────┐                                 │
//! │  │ collector  │──▶│  ranking   │──▶ ScreenReport                 │
//! │  │ (deadline) │   └────────────┘                                 │
//! │  └────────────┘                                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use pairfinder_screener::screener::{ScreenConfig, ScreenerEngine, SortKey};
//!
//! let engine = ScreenerEngine::from_config(&config);
//! let report = engine
//!     .run_screen(&ScreenConfig::default().with_sort_key(SortKey::Volume).with_limit(10))
//!     .await?;
//! ```

pub mod config;
pub mod engine;
pub mod metrics;
pub mod ranking;
pub mod suggestion;

pub use config::{parse_exchanges, EngineSettings, ScreenConfig, SortKey, MAX_TIMEOUT};
pub use engine::{
    select_candidates, ExchangeReport, ScreenCollection, ScreenReport, ScreenerEngine,
};
pub use metrics::{
    compute_metrics, DegradedReason, MetricsCalculator, MetricsStatus, ScoreWeights,
    SymbolMetrics,
};
pub use ranking::{compare, filter_liquid, rank, sort_value, ScreenResult};
pub use suggestion::{suggest, RiskLevel, SuggestedBotSettings};
