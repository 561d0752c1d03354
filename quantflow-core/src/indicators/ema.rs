//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = (close[t] - EMA[t-1]) * multiplier + EMA[t-1],
//! multiplier = 2 / (period + 1).
//! Seed: EMA[period-1] = SMA of first `period` close values.

use super::IndicatorResult;
use crate::domain::Bar;

pub fn ema(bars: &[Bar], period: usize) -> IndicatorResult {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    IndicatorResult::single(ema_of_series(&closes, period))
}

/// Raw EMA over a pre-extracted f64 slice.
///
/// Used by composed indicators (MACD's signal line) that need an EMA of an
/// arbitrary series rather than of closes.
pub fn ema_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 || n < period {
        return result;
    }

    let multiplier = 2.0 / (period as f64 + 1.0);

    // Seed: SMA of first `period` values
    let seed = values.iter().take(period).sum::<f64>() / period as f64;
    result[period - 1] = seed;

    let mut prev = seed;
    for i in period..n {
        let value = (values[i] - prev) * multiplier + prev;
        result[i] = value;
        prev = value;
    }

    result
}
