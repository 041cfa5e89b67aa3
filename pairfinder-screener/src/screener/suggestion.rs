//! Suggested trading-bot settings for a screened symbol.
//!
//! Pure function of the metrics: leverage, stops and timeframe follow the
//! volatility band, trade size follows 24h volume.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::metrics::SymbolMetrics;

/// Take profit as a multiple of stop loss.
const REWARD_RISK_RATIO: f64 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        })
    }
}

/// Bot parameters derived from a symbol's metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedBotSettings {
    pub leverage: u32,
    pub risk_level: RiskLevel,
    /// Quote currency per trade
    pub trade_amount: f64,
    /// Percent
    pub stop_loss: f64,
    /// Percent
    pub take_profit: f64,
    pub timeframe: String,
    pub reasoning: String,
}

/// Volatility bands: `< 1.0`, `< 2.0`, `< 3.5`, rest.
fn volatility_band(volatility: f64) -> usize {
    if volatility < 1.0 {
        0
    } else if volatility < 2.0 {
        1
    } else if volatility < 3.5 {
        2
    } else {
        3
    }
}

fn risk_level(m: &SymbolMetrics) -> RiskLevel {
    if m.volatility < 1.5 && m.change_30d > 0.0 && m.change_24h > -5.0 {
        RiskLevel::Low
    } else if m.volatility > 3.0 || m.change_24h.abs() > 15.0 || m.change_30d.abs() > 50.0 {
        RiskLevel::High
    } else {
        RiskLevel::Medium
    }
}

fn trade_amount(volume_24h: f64) -> f64 {
    if volume_24h > 100_000_000.0 {
        200.0
    } else if volume_24h > 50_000_000.0 {
        150.0
    } else if volume_24h > 10_000_000.0 {
        100.0
    } else {
        50.0
    }
}

/// Suggest bot settings for `metrics`.
pub fn suggest(metrics: &SymbolMetrics) -> SuggestedBotSettings {
    const LEVERAGE: [u32; 4] = [7, 5, 3, 2];
    const STOP_LOSS: [f64; 4] = [1.5, 2.0, 3.0, 4.0];

    let band = volatility_band(metrics.volatility);
    let risk_level = risk_level(metrics);
    let leverage = LEVERAGE[band];
    let stop_loss = STOP_LOSS[band];
    let timeframe = match band {
        0 => "4h",
        1 => "1h",
        _ => "15m",
    };

    let sign = if metrics.change_30d >= 0.0 { "+" } else { "" };
    let reasoning = format!(
        "Based on {}'s {:.2}% volatility, {:.1}M 24h volume, and {}{:.2}% 30d performance, \
         we recommend {} risk settings with {}x leverage.",
        metrics.symbol,
        metrics.volatility,
        metrics.volume_24h / 1_000_000.0,
        sign,
        metrics.change_30d,
        risk_level,
        leverage
    );

    SuggestedBotSettings {
        leverage,
        risk_level,
        trade_amount: trade_amount(metrics.volume_24h),
        stop_loss,
        take_profit: stop_loss * REWARD_RISK_RATIO,
        timeframe: timeframe.to_string(),
        reasoning,
    }
}
