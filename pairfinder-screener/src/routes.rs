//! HTTP routes for the screener service.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use pairfinder_common::{Error, ValidationError, ValidationResult};

use crate::exchange::ExchangeId;
use crate::screener::{
    parse_exchanges, suggest, ExchangeReport, ScreenConfig, SortKey, SuggestedBotSettings,
    SymbolMetrics,
};
use crate::ScreenerState;

// ============================================================================
// Request Types
// ============================================================================

/// Query parameters of `GET /api/v1/pairs`. Missing values use the
/// configured defaults.
#[derive(Debug, Default, Deserialize)]
pub struct PairsQuery {
    /// Comma-separated exchange list
    pub exchanges: Option<String>,
    pub min_volume: Option<f64>,
    pub max_candidates: Option<usize>,
    pub sort: Option<String>,
    /// Signed so that `limit=0` and negative values reach validation
    pub limit: Option<i64>,
    pub days: Option<u32>,
    pub timeout_ms: Option<u64>,
}

impl PairsQuery {
    /// Overlay the query on `defaults`. A requested timeout is clamped to
    /// `timeout_cap`.
    pub fn to_screen_config(
        &self,
        defaults: &ScreenConfig,
        timeout_cap: Duration,
    ) -> ValidationResult<ScreenConfig> {
        let mut config = defaults.clone();

        if let Some(ref list) = self.exchanges {
            config.exchanges = parse_exchanges(list.split(','))?;
            if config.exchanges.is_empty() {
                return Err(ValidationError::MissingField {
                    field: "exchanges".into(),
                });
            }
        }
        if let Some(min_volume) = self.min_volume {
            config.min_volume = min_volume;
        }
        if let Some(max_candidates) = self.max_candidates {
            config.max_candidates = max_candidates;
        }
        if let Some(ref sort) = self.sort {
            config.sort_key = sort
                .parse::<SortKey>()
                .map_err(|e| ValidationError::invalid("sort", e))?;
        }
        if let Some(limit) = self.limit {
            if limit < 1 {
                return Err(ValidationError::invalid("limit", "must be at least 1"));
            }
            config.limit = usize::try_from(limit).unwrap_or(usize::MAX);
        }
        if let Some(days) = self.days {
            config.history_days = days;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout = Some(Duration::from_millis(timeout_ms).min(timeout_cap));
        }

        Ok(config)
    }
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub service: String,
}

#[derive(Debug, Serialize)]
pub struct ExchangesResponse {
    /// Exchanges with a registered adapter
    pub exchanges: Vec<ExchangeId>,
    /// Exchanges screened when the request names none
    pub default: Vec<ExchangeId>,
}

/// One ranked pair.
#[derive(Debug, Serialize)]
pub struct PairEntry {
    /// 1-based position in the ranking
    pub rank: usize,
    #[serde(flatten)]
    pub metrics: SymbolMetrics,
    pub suggested_settings: SuggestedBotSettings,
}

#[derive(Debug, Serialize)]
pub struct PairsResponse {
    pub run_id: String,
    pub pairs: Vec<PairEntry>,
    pub count: usize,
    pub total_candidates: usize,
    pub sort_key: SortKey,
    pub exchanges: Vec<ExchangeReport>,
    pub timed_out: bool,
    pub duration_secs: f64,
}

// ============================================================================
// Errors
// ============================================================================

/// Error body returned by every route.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Route error mapped onto an HTTP status.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl<E: Into<Error>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let code = self.0.code();

        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self.0, "Request failed");
        }

        let body = serde_json::json!({
            "success": false,
            "error": ErrorBody {
                code: code.to_string(),
                message: self.0.to_string(),
            }
        });

        (status, Json(body)).into_response()
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        service: "pairfinder-screener".to_string(),
    })
}

/// List registered exchanges
pub async fn get_exchanges(State(state): State<Arc<ScreenerState>>) -> Json<ExchangesResponse> {
    Json(ExchangesResponse {
        exchanges: state.engine.registry().ids(),
        default: state.defaults.unique_exchanges(),
    })
}

/// Run a screen and return the ranked pairs
pub async fn get_pairs(
    State(state): State<Arc<ScreenerState>>,
    Query(query): Query<PairsQuery>,
) -> Result<Json<PairsResponse>, ApiError> {
    let config = query.to_screen_config(&state.defaults, state.timeout_cap)?;
    let report = state.engine.run_screen(&config).await?;

    let pairs: Vec<PairEntry> = report
        .result
        .entries
        .into_iter()
        .enumerate()
        .map(|(i, metrics)| PairEntry {
            rank: i + 1,
            suggested_settings: suggest(&metrics),
            metrics,
        })
        .collect();

    Ok(Json(PairsResponse {
        run_id: report.id,
        count: pairs.len(),
        pairs,
        total_candidates: report.result.total_candidates,
        sort_key: report.result.sort_key,
        exchanges: report.exchanges,
        timed_out: report.timed_out,
        duration_secs: report.duration_secs,
    }))
}
