//! Ranking of computed metrics.
//!
//! Ordering is descending by the sort key, ties broken by symbol then
//! exchange (both ascending). Floats are compared with `total_cmp`, so the
//! order is total and deterministic.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use pairfinder_common::ValidationError;

use super::config::SortKey;
use super::metrics::SymbolMetrics;
use crate::error::ScreenError;

/// Ranked, truncated screen output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenResult {
    /// Best first
    pub entries: Vec<SymbolMetrics>,
    pub sort_key: SortKey,
    pub limit: usize,
    /// Candidates before truncation
    pub total_candidates: usize,
}

impl ScreenResult {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Value of `metrics` under `key`.
pub fn sort_value(metrics: &SymbolMetrics, key: SortKey) -> f64 {
    match key {
        SortKey::Performance => metrics.performance_score,
        SortKey::Change24h => metrics.change_24h,
        SortKey::Change30d => metrics.change_30d,
        SortKey::Volume => metrics.volume_24h,
    }
}

/// Total order used for ranking.
pub fn compare(a: &SymbolMetrics, b: &SymbolMetrics, key: SortKey) -> Ordering {
    sort_value(b, key)
        .total_cmp(&sort_value(a, key))
        .then_with(|| a.symbol.cmp(&b.symbol))
        .then_with(|| a.exchange.cmp(&b.exchange))
}

/// Sort a copy of `metrics` and keep the top `limit`.
pub fn rank(
    metrics: &[SymbolMetrics],
    sort_key: SortKey,
    limit: usize,
) -> Result<ScreenResult, ScreenError> {
    if limit == 0 {
        return Err(ValidationError::invalid("limit", "must be at least 1").into());
    }

    let mut entries = metrics.to_vec();
    entries.sort_by(|a, b| compare(a, b, sort_key));
    entries.truncate(limit);

    Ok(ScreenResult {
        entries,
        sort_key,
        limit,
        total_candidates: metrics.len(),
    })
}

/// Metrics whose 24h volume meets `min_volume`.
pub fn filter_liquid(metrics: &[SymbolMetrics], min_volume: f64) -> Vec<SymbolMetrics> {
    metrics
        .iter()
        .filter(|m| m.volume_24h >= min_volume)
        .cloned()
        .collect()
}
