//! Screener engine module.
//!
//! The orchestrator of a screen run. Each exchange is handled by its own
//! task: fetch tickers, keep the most liquid candidates, then fetch candles
//! for those candidates concurrently (bounded by a semaphore) and compute
//! metrics. Every outcome is sent over a channel to a single collector,
//! which also enforces the overall deadline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant as StdInstant;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn, Instrument};

use pairfinder_common::logging::generate_trace_id;
use pairfinder_common::{Config, Validate, ValidationError};

use super::config::{EngineSettings, ScreenConfig};
use super::metrics::{MetricsCalculator, ScoreWeights, SymbolMetrics};
use super::ranking::{filter_liquid, rank, ScreenResult};
use crate::error::ScreenError;
use crate::exchange::{ExchangeAdapter, ExchangeId, ExchangeRegistry, FetchError, RawTicker};

/// Capacity of the collector channel.
const EVENT_BUFFER: usize = 256;

// ============================================================================
// Reports
// ============================================================================

/// What happened on one exchange during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeReport {
    pub exchange: ExchangeId,
    /// Tickers returned by the exchange
    pub tickers_fetched: usize,
    /// Symbols selected for candle fetches
    pub candidates: usize,
    /// Metrics records received
    pub screened: usize,
    /// Of which degraded
    pub degraded: usize,
    /// Ticker fetch error, if the exchange was skipped
    pub error: Option<String>,
    /// The ticker failure is transient and a later run may succeed
    pub retryable: bool,
    /// All candidates processed before the deadline
    pub finished: bool,
}

impl ExchangeReport {
    fn new(exchange: ExchangeId) -> Self {
        Self {
            exchange,
            tickers_fetched: 0,
            candidates: 0,
            screened: 0,
            degraded: 0,
            error: None,
            retryable: false,
            finished: false,
        }
    }

    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Unranked output of [`ScreenerEngine::collect`].
#[derive(Debug, Clone)]
pub struct ScreenCollection {
    /// Metrics in arrival order
    pub metrics: Vec<SymbolMetrics>,
    /// One report per requested exchange, in request order
    pub exchanges: Vec<ExchangeReport>,
    pub timed_out: bool,
}

/// Result of a full screen run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenReport {
    /// Run ID
    pub id: String,
    pub result: ScreenResult,
    pub exchanges: Vec<ExchangeReport>,
    /// Deadline expired before every exchange finished
    pub timed_out: bool,
    /// Screening configuration used
    pub config_summary: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// Duration in seconds
    pub duration_secs: f64,
}

impl ScreenReport {
    /// Symbols that were computed from missing or partial history.
    pub fn degraded_count(&self) -> usize {
        self.result.entries.iter().filter(|m| m.is_degraded()).count()
    }
}

// ============================================================================
// Events
// ============================================================================

#[derive(Debug)]
enum ScreenEvent {
    Tickers {
        exchange: ExchangeId,
        fetched: usize,
        candidates: usize,
    },
    Metrics(SymbolMetrics),
    ExchangeFailed {
        exchange: ExchangeId,
        error: FetchError,
    },
    ExchangeFinished {
        exchange: ExchangeId,
    },
}

/// Everything an exchange task needs, owned.
#[derive(Clone, Copy)]
struct ExchangeJob {
    min_volume: f64,
    max_candidates: usize,
    history_days: u32,
    concurrency: usize,
    calculator: MetricsCalculator,
}

// ============================================================================
// Screener Engine
// ============================================================================

/// Multi-exchange screen orchestrator.
pub struct ScreenerEngine {
    registry: ExchangeRegistry,
    settings: EngineSettings,
    weights: ScoreWeights,
}

impl ScreenerEngine {
    pub fn new(registry: ExchangeRegistry, settings: EngineSettings) -> Self {
        Self {
            registry,
            settings,
            weights: ScoreWeights::default(),
        }
    }

    /// Engine over every enabled exchange in `config`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            ExchangeRegistry::from_config(config),
            EngineSettings::from_settings(&config.screener),
        )
    }

    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn registry(&self) -> &ExchangeRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Run a screen: collect, apply the liquidity filter, rank.
    pub async fn run_screen(&self, config: &ScreenConfig) -> Result<ScreenReport, ScreenError> {
        let id = generate_trace_id();
        let started_at = Utc::now();
        let start = StdInstant::now();

        let span = tracing::info_span!("screen", run_id = %id);
        let collection = async {
            info!(config = %config.summary(), "Starting screen");
            self.collect(config).await
        }
        .instrument(span.clone())
        .await?;

        let liquid = filter_liquid(&collection.metrics, config.min_volume);
        let result = rank(&liquid, config.sort_key, config.limit)?;

        let report = ScreenReport {
            id,
            result,
            exchanges: collection.exchanges,
            timed_out: collection.timed_out,
            config_summary: config.summary(),
            started_at,
            completed_at: Utc::now(),
            duration_secs: start.elapsed().as_secs_f64(),
        };

        span.in_scope(|| {
            info!(
                screened = collection.metrics.len(),
                returned = report.result.len(),
                degraded = report.degraded_count(),
                timed_out = report.timed_out,
                duration_secs = report.duration_secs,
                "Screen completed"
            );
        });

        Ok(report)
    }

    /// Fetch and compute metrics on every requested exchange.
    ///
    /// Returns unranked metrics. Exchanges whose ticker fetch fails are
    /// skipped; if all of them fail the run is an error. When the deadline
    /// expires the metrics received so far are returned with `timed_out`.
    pub async fn collect(&self, config: &ScreenConfig) -> Result<ScreenCollection, ScreenError> {
        config.validate()?;

        let exchanges = config.unique_exchanges();
        let mut adapters = Vec::with_capacity(exchanges.len());
        for id in &exchanges {
            match self.registry.get(*id) {
                Some(adapter) => adapters.push(adapter),
                None => {
                    return Err(ValidationError::invalid(
                        "exchanges",
                        format!("exchange '{}' is not configured", id),
                    )
                    .into())
                }
            }
        }

        let job = ExchangeJob {
            min_volume: config.min_volume,
            max_candidates: config.max_candidates,
            history_days: config.history_days,
            concurrency: self.settings.concurrency.max(1),
            calculator: MetricsCalculator::new(config.history_days).with_weights(self.weights),
        };
        let timeout = config.effective_timeout(self.settings.default_timeout);
        let deadline = Instant::now() + timeout;

        let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);
        let mut tasks = JoinSet::new();
        for adapter in adapters {
            let tx = tx.clone();
            tasks.spawn(screen_exchange(adapter, job, tx).in_current_span());
        }
        drop(tx);

        let mut reports: HashMap<ExchangeId, ExchangeReport> = exchanges
            .iter()
            .map(|id| (*id, ExchangeReport::new(*id)))
            .collect();
        let mut failures: Vec<(ExchangeId, FetchError)> = Vec::new();
        let mut metrics = Vec::new();
        let mut timed_out = false;

        let sleep = tokio::time::sleep_until(deadline);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                event = rx.recv() => {
                    let Some(event) = event else { break };
                    match event {
                        ScreenEvent::Tickers { exchange, fetched, candidates } => {
                            if let Some(r) = reports.get_mut(&exchange) {
                                r.tickers_fetched = fetched;
                                r.candidates = candidates;
                            }
                        }
                        ScreenEvent::Metrics(m) => {
                            if let Some(r) = reports.get_mut(&m.exchange) {
                                r.screened += 1;
                                if m.is_degraded() {
                                    r.degraded += 1;
                                }
                            }
                            metrics.push(m);
                        }
                        ScreenEvent::ExchangeFailed { exchange, error } => {
                            if let Some(r) = reports.get_mut(&exchange) {
                                r.error = Some(error.to_string());
                                r.retryable = error.is_recoverable();
                            }
                            failures.push((exchange, error));
                        }
                        ScreenEvent::ExchangeFinished { exchange } => {
                            if let Some(r) = reports.get_mut(&exchange) {
                                r.finished = true;
                            }
                        }
                    }
                }
                _ = &mut sleep => {
                    timed_out = true;
                    tasks.abort_all();
                    warn!(
                        timeout_ms = timeout.as_millis() as u64,
                        collected = metrics.len(),
                        "Screen deadline reached, returning partial results"
                    );
                    break;
                }
            }
        }

        if !timed_out {
            while let Some(joined) = tasks.join_next().await {
                if let Err(e) = joined {
                    if e.is_panic() {
                        warn!(error = %e, "Exchange task panicked");
                    }
                }
            }
        }

        if !exchanges.is_empty() && failures.len() == exchanges.len() {
            warn!(failed = failures.len(), "All exchanges failed");
            return Err(ScreenError::AllExchangesFailed { failures });
        }

        let exchanges = exchanges
            .iter()
            .filter_map(|id| reports.remove(id))
            .collect();

        Ok(ScreenCollection {
            metrics,
            exchanges,
            timed_out,
        })
    }
}

/// Liquid tickers, highest volume first, at most `max_candidates`.
///
/// Ties are ordered by symbol; a symbol listed twice is kept once.
pub fn select_candidates(
    mut tickers: Vec<RawTicker>,
    min_volume: f64,
    max_candidates: usize,
) -> Vec<RawTicker> {
    tickers.retain(|t| t.volume_24h.is_finite() && t.volume_24h >= min_volume);
    tickers.sort_by(|a, b| {
        b.volume_24h
            .total_cmp(&a.volume_24h)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });

    let mut selected: Vec<RawTicker> = Vec::with_capacity(max_candidates.min(tickers.len()));
    for ticker in tickers {
        if selected.len() >= max_candidates {
            break;
        }
        if !selected.iter().any(|t| t.symbol == ticker.symbol) {
            selected.push(ticker);
        }
    }
    selected
}

/// Screen one exchange, reporting every outcome on `tx`.
async fn screen_exchange(
    adapter: Arc<dyn ExchangeAdapter>,
    job: ExchangeJob,
    tx: mpsc::Sender<ScreenEvent>,
) {
    let exchange = adapter.id();
    let start = StdInstant::now();

    let tickers = match adapter.fetch_tickers().await {
        Ok(tickers) => tickers,
        Err(error) => {
            warn!(
                exchange = %exchange,
                error = %error,
                recoverable = error.is_recoverable(),
                "Ticker fetch failed, skipping exchange"
            );
            let _ = tx.send(ScreenEvent::ExchangeFailed { exchange, error }).await;
            return;
        }
    };

    let fetched = tickers.len();
    let candidates = select_candidates(tickers, job.min_volume, job.max_candidates);

    info!(
        exchange = %exchange,
        tickers = fetched,
        candidates = candidates.len(),
        "Fetched tickers"
    );

    if tx
        .send(ScreenEvent::Tickers {
            exchange,
            fetched,
            candidates: candidates.len(),
        })
        .await
        .is_err()
    {
        return;
    }

    let semaphore = Arc::new(Semaphore::new(job.concurrency));
    let mut symbols = JoinSet::new();

    for ticker in candidates {
        let adapter = Arc::clone(&adapter);
        let semaphore = Arc::clone(&semaphore);
        let tx = tx.clone();
        let calculator = job.calculator;
        let days = job.history_days;

        symbols.spawn(
            async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };

                let metrics = match adapter.fetch_daily_candles(&ticker.symbol, days).await {
                    Ok(candles) => calculator.compute(&ticker, &candles),
                    Err(error) => {
                        warn!(
                            exchange = %ticker.exchange,
                            symbol = %ticker.symbol,
                            error = %error,
                            "Candle fetch failed, keeping degraded metrics"
                        );
                        calculator.compute_degraded(&ticker, &error)
                    }
                };

                debug!(
                    symbol = %metrics.symbol,
                    score = metrics.performance_score,
                    "Computed metrics"
                );
                let _ = tx.send(ScreenEvent::Metrics(metrics)).await;
            }
            .in_current_span(),
        );
    }

    while let Some(joined) = symbols.join_next().await {
        if let Err(e) = joined {
            if e.is_panic() {
                warn!(exchange = %exchange, error = %e, "Symbol task panicked");
            }
        }
    }

    info!(
        exchange = %exchange,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Exchange screened"
    );
    let _ = tx.send(ScreenEvent::ExchangeFinished { exchange }).await;
}

// ============================================================================
// Tests
// ============================================================================
