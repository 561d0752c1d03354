//! Summary statistics — pure functions from trades and the equity curve.
//!
//! Every metric is a pure function: trade list and/or equity curve in, scalar
//! out. No dependency on the engine loop or the compiler.

use crate::domain::Trade;

use super::result::{BacktestSummary, EquityPoint};

/// Seconds in a Julian year, the annualization base.
const SECS_PER_YEAR: f64 = 365.25 * 24.0 * 3600.0;

/// Assembles the full summary from a finished run.
///
/// The equity curve starts at the first evaluated (post-warm-up) bar, so its
/// endpoints define the annualization window. An empty curve yields the
/// zeroed summary.
pub fn compute_summary(
    initial_equity: f64,
    trades: &[Trade],
    equity_curve: &[EquityPoint],
) -> BacktestSummary {
    let Some(last) = equity_curve.last() else {
        return BacktestSummary::empty(initial_equity);
    };
    let final_equity = last.equity;

    let winning_trades = trades.iter().filter(|t| t.is_winner()).count();
    let losing_trades = trades.len() - winning_trades;

    let equity: Vec<f64> = equity_curve.iter().map(|p| p.equity).collect();
    let years = (last.timestamp - equity_curve[0].timestamp).num_seconds() as f64 / SECS_PER_YEAR;

    BacktestSummary {
        initial_equity,
        final_equity,
        total_return_pct: (final_equity - initial_equity) / initial_equity * 100.0,
        annual_return: annual_return(initial_equity, final_equity, years),
        total_trades: trades.len(),
        winning_trades,
        losing_trades,
        win_rate: win_rate(trades),
        profit_factor: profit_factor(trades),
        sharpe_ratio: sharpe_ratio(&equity, bars_per_year(equity_curve)),
        max_drawdown: max_drawdown_pct(&equity),
    }
}

/// Percent of closed trades with positive net profit. 0 with no trades.
pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64 * 100.0
}

/// Gross profit over gross loss.
///
/// Infinity when there are wins and no losses; 0 when there are neither.
pub fn profit_factor(trades: &[Trade]) -> f64 {
    let gross_profit: f64 = trades.iter().filter(|t| t.profit > 0.0).map(|t| t.profit).sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.profit <= 0.0)
        .map(|t| -t.profit)
        .sum();
    if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else if gross_profit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}

/// Annualized Sharpe ratio of per-bar equity returns.
///
/// Sharpe = mean(returns) / std(returns) × √bars_per_year.
/// 0 when the deviation is 0 or fewer than 2 curve points exist.
pub fn sharpe_ratio(equity: &[f64], bars_per_year: f64) -> f64 {
    if equity.len() < 2 {
        return 0.0;
    }
    let returns: Vec<f64> = equity
        .windows(2)
        .map(|w| if w[0] != 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect();
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance =
        returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / returns.len() as f64;
    let std = variance.sqrt();
    if std < 1e-15 {
        return 0.0;
    }
    mean / std * bars_per_year.sqrt()
}

/// Annualized return in percent.
///
/// `(final/initial)^(1/years) - 1` × 100, guarding the non-positive base:
/// total loss reports -100, and a window too short to annualize reports 0.
pub fn annual_return(initial_equity: f64, final_equity: f64, years: f64) -> f64 {
    if years <= 0.0 || initial_equity <= 0.0 {
        return 0.0;
    }
    if final_equity <= 0.0 {
        return -100.0;
    }
    ((final_equity / initial_equity).powf(1.0 / years) - 1.0) * 100.0
}

/// Largest peak-to-trough decline in percent (positive number).
pub fn max_drawdown_pct(equity: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for &value in equity {
        if value > peak {
            peak = value;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - value) / peak * 100.0);
        }
    }
    max_dd
}

/// Bars per year, inferred from the median timestamp spacing of the curve.
///
/// Tolerates calendar gaps (weekends, holidays): the median spacing of a
/// daily equities series is still one day. Falls back to daily when fewer
/// than 2 points exist.
pub fn bars_per_year(curve: &[EquityPoint]) -> f64 {
    if curve.len() < 2 {
        return 365.25;
    }
    let mut spacings: Vec<i64> = curve
        .windows(2)
        .map(|w| (w[1].timestamp - w[0].timestamp).num_seconds())
        .filter(|&s| s > 0)
        .collect();
    if spacings.is_empty() {
        return 365.25;
    }
    spacings.sort_unstable();
    let median = spacings[spacings.len() / 2] as f64;
    SECS_PER_YEAR / median
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PositionSide;
    use chrono::{Duration, TimeZone, Utc};

    fn trade(profit: f64) -> Trade {
        let entry_time = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        Trade {
            entry_time,
            exit_time: entry_time + Duration::days(1),
            entry_price: 100.0,
            exit_price: 100.0 + profit,
            side: PositionSide::Long,
            quantity: 1.0,
            profit,
            profit_pct: profit,
            commission: 0.0,
            duration_secs: 86_400,
        }
    }

    fn curve(values: &[f64]) -> Vec<EquityPoint> {
        let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &equity)| EquityPoint {
                timestamp: base + Duration::days(i as i64),
                equity,
            })
            .collect()
    }

    #[test]
    fn win_rate_basic() {
        let trades = [trade(10.0), trade(-5.0), trade(3.0), trade(-1.0)];
        assert_eq!(win_rate(&trades), 50.0);
        assert_eq!(win_rate(&[]), 0.0);
    }

    #[test]
    fn profit_factor_basic() {
        let trades = [trade(10.0), trade(-5.0)];
        assert_eq!(profit_factor(&trades), 2.0);
    }

    #[test]
    fn profit_factor_lossless_is_infinite() {
        let trades = [trade(10.0), trade(4.0)];
        assert_eq!(profit_factor(&trades), f64::INFINITY);
    }

    #[test]
    fn profit_factor_tradeless_is_zero() {
        assert_eq!(profit_factor(&[]), 0.0);
    }

    #[test]
    fn breakeven_trade_counts_as_loss_side() {
        // profit == 0 is not a winner and contributes nothing to either side
        let trades = [trade(0.0)];
        assert_eq!(win_rate(&trades), 0.0);
        assert_eq!(profit_factor(&trades), 0.0);
    }

    #[test]
    fn sharpe_is_zero_for_flat_equity() {
        assert_eq!(sharpe_ratio(&[100.0, 100.0, 100.0], 252.0), 0.0);
        assert_eq!(sharpe_ratio(&[100.0], 252.0), 0.0);
    }

    #[test]
    fn sharpe_positive_for_steady_gains() {
        // Slightly uneven gains so the deviation is non-zero
        let equity = [100.0, 101.0, 102.5, 103.0, 104.8, 105.5];
        assert!(sharpe_ratio(&equity, 252.0) > 0.0);
    }

    #[test]
    fn annual_return_guards() {
        assert_eq!(annual_return(10_000.0, 20_000.0, 0.0), 0.0);
        assert_eq!(annual_return(10_000.0, 0.0, 1.0), -100.0);
        assert_eq!(annual_return(10_000.0, -50.0, 1.0), -100.0);
    }

    #[test]
    fn annual_return_doubling_in_one_year() {
        let r = annual_return(10_000.0, 20_000.0, 1.0);
        assert!((r - 100.0).abs() < 1e-9);
    }

    #[test]
    fn max_drawdown_basic() {
        // Peak 120, trough 90 → 25%
        let equity = [100.0, 120.0, 90.0, 110.0];
        assert!((max_drawdown_pct(&equity) - 25.0).abs() < 1e-9);
    }

    #[test]
    fn max_drawdown_monotonic_is_zero() {
        assert_eq!(max_drawdown_pct(&[100.0, 110.0, 120.0]), 0.0);
        assert_eq!(max_drawdown_pct(&[]), 0.0);
    }

    #[test]
    fn bars_per_year_daily_spacing() {
        let c = curve(&[100.0, 101.0, 102.0, 103.0]);
        let bpy = bars_per_year(&c);
        assert!((bpy - 365.25).abs() < 1.0);
    }

    #[test]
    fn bars_per_year_hourly_spacing() {
        let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let c: Vec<EquityPoint> = (0..5)
            .map(|i| EquityPoint {
                timestamp: base + Duration::hours(i),
                equity: 100.0,
            })
            .collect();
        let bpy = bars_per_year(&c);
        assert!((bpy - 365.25 * 24.0).abs() < 1.0);
    }

    #[test]
    fn compute_summary_empty_curve() {
        let summary = compute_summary(10_000.0, &[], &[]);
        assert_eq!(summary, BacktestSummary::empty(10_000.0));
    }

    #[test]
    fn compute_summary_counts_trades() {
        let trades = [trade(10.0), trade(-5.0)];
        let summary = compute_summary(10_000.0, &trades, &curve(&[10_000.0, 10_010.0, 10_005.0]));
        assert_eq!(summary.total_trades, 2);
        assert_eq!(summary.winning_trades, 1);
        assert_eq!(summary.losing_trades, 1);
        assert_eq!(summary.final_equity, 10_005.0);
        assert!((summary.total_return_pct - 0.05).abs() < 1e-9);
    }
}
