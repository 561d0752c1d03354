//! Simple Moving Average (SMA).
//!
//! Rolling mean of close prices over a lookback window.
//! First valid value at index period - 1.

use super::IndicatorResult;
use crate::domain::Bar;

pub fn sma(bars: &[Bar], period: usize) -> IndicatorResult {
    let n = bars.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 || n < period {
        return IndicatorResult::single(result);
    }

    // Initial window sum
    let mut sum: f64 = bars.iter().take(period).map(|b| b.close).sum();
    result[period - 1] = sum / period as f64;

    // Roll the window forward
    for i in period..n {
        sum += bars[i].close - bars[i - period].close;
        result[i] = sum / period as f64;
    }

    IndicatorResult::single(result)
}
