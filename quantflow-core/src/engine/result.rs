//! Backtest result types and the optimizer's target-metric selector.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::Trade;

/// Single point in the equity curve. One is recorded per evaluated bar,
/// whether or not a trade occurred.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
}

/// Aggregate statistics for one backtest run.
///
/// Serialized with the field names the platform's API uses
/// (`winRate`, `profitFactor`, …).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestSummary {
    pub initial_equity: f64,
    pub final_equity: f64,
    #[serde(rename = "totalReturnPercent")]
    pub total_return_pct: f64,
    /// Annualized return in percent. -100 on total loss.
    pub annual_return: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// Percent of closed trades with positive net profit. 0 with no trades.
    pub win_rate: f64,
    /// Gross profit / gross loss. Infinity when lossless with wins, 0 when
    /// tradeless.
    pub profit_factor: f64,
    /// Annualized mean/σ of per-bar returns. 0 when σ is 0.
    pub sharpe_ratio: f64,
    /// Largest peak-to-trough equity decline, in percent.
    pub max_drawdown: f64,
}

impl BacktestSummary {
    /// Zeroed summary for a run that never traded (e.g. series shorter than
    /// the warm-up window).
    pub fn empty(initial_equity: f64) -> Self {
        Self {
            initial_equity,
            final_equity: initial_equity,
            total_return_pct: 0.0,
            annual_return: 0.0,
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            win_rate: 0.0,
            profit_factor: 0.0,
            sharpe_ratio: 0.0,
            max_drawdown: 0.0,
        }
    }
}

/// Complete result of a single backtest run. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Deterministic identity of (graph, parameters) — see
    /// [`crate::fingerprint`].
    pub fingerprint: String,
    pub summary: BacktestSummary,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
}

/// Summary metric an optimization sweep selects its best combination by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetMetric {
    #[serde(rename = "finalEquity")]
    FinalEquity,
    #[serde(rename = "totalReturnPercent")]
    TotalReturn,
    #[serde(rename = "annualReturn")]
    AnnualReturn,
    #[serde(rename = "winRate")]
    WinRate,
    #[serde(rename = "profitFactor")]
    ProfitFactor,
    #[serde(rename = "sharpeRatio")]
    SharpeRatio,
    #[serde(rename = "maxDrawdown")]
    MaxDrawdown,
}

impl TargetMetric {
    /// Reads this metric out of a summary.
    pub fn value_of(self, summary: &BacktestSummary) -> f64 {
        match self {
            TargetMetric::FinalEquity => summary.final_equity,
            TargetMetric::TotalReturn => summary.total_return_pct,
            TargetMetric::AnnualReturn => summary.annual_return,
            TargetMetric::WinRate => summary.win_rate,
            TargetMetric::ProfitFactor => summary.profit_factor,
            TargetMetric::SharpeRatio => summary.sharpe_ratio,
            TargetMetric::MaxDrawdown => summary.max_drawdown,
        }
    }

    /// Drawdown is minimized; every other metric is maximized.
    pub fn lower_is_better(self) -> bool {
        matches!(self, TargetMetric::MaxDrawdown)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TargetMetric::FinalEquity => "finalEquity",
            TargetMetric::TotalReturn => "totalReturnPercent",
            TargetMetric::AnnualReturn => "annualReturn",
            TargetMetric::WinRate => "winRate",
            TargetMetric::ProfitFactor => "profitFactor",
            TargetMetric::SharpeRatio => "sharpeRatio",
            TargetMetric::MaxDrawdown => "maxDrawdown",
        }
    }
}

impl fmt::Display for TargetMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "finalEquity" => Ok(TargetMetric::FinalEquity),
            "totalReturnPercent" => Ok(TargetMetric::TotalReturn),
            "annualReturn" => Ok(TargetMetric::AnnualReturn),
            "winRate" => Ok(TargetMetric::WinRate),
            "profitFactor" => Ok(TargetMetric::ProfitFactor),
            "sharpeRatio" => Ok(TargetMetric::SharpeRatio),
            "maxDrawdown" => Ok(TargetMetric::MaxDrawdown),
            other => Err(format!("unknown target metric '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_metric_direction() {
        assert!(TargetMetric::MaxDrawdown.lower_is_better());
        assert!(!TargetMetric::SharpeRatio.lower_is_better());
        assert!(!TargetMetric::ProfitFactor.lower_is_better());
    }

    #[test]
    fn target_metric_roundtrips_through_str() {
        for metric in [
            TargetMetric::FinalEquity,
            TargetMetric::TotalReturn,
            TargetMetric::AnnualReturn,
            TargetMetric::WinRate,
            TargetMetric::ProfitFactor,
            TargetMetric::SharpeRatio,
            TargetMetric::MaxDrawdown,
        ] {
            assert_eq!(metric.as_str().parse::<TargetMetric>().unwrap(), metric);
        }
        assert!("sortino".parse::<TargetMetric>().is_err());
    }

    #[test]
    fn summary_field_names_match_platform_api() {
        let json = serde_json::to_value(BacktestSummary::empty(10_000.0)).unwrap();
        for key in [
            "initialEquity",
            "finalEquity",
            "totalReturnPercent",
            "annualReturn",
            "totalTrades",
            "winRate",
            "profitFactor",
            "sharpeRatio",
            "maxDrawdown",
        ] {
            assert!(json.get(key).is_some(), "missing key {key}");
        }
    }
}
