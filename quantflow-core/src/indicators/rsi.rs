//! Relative Strength Index (RSI).
//!
//! Wilder smoothing: seed average gain/loss is the simple mean over the first
//! `period` deltas, thereafter avg = (avg * (period-1) + current) / period.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss).
//! First valid value at index `period` (one delta per bar after the first).
//! Edge cases: avg_loss == 0 with avg_gain > 0 → 100; avg_gain == 0 → 0.

use super::IndicatorResult;
use crate::domain::Bar;

pub fn rsi(bars: &[Bar], period: usize) -> IndicatorResult {
    let n = bars.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 || n < period + 1 {
        return IndicatorResult::single(result);
    }

    // Deltas, split into gain/loss magnitudes
    let mut gains = vec![0.0; n];
    let mut losses = vec![0.0; n];
    for i in 1..n {
        let change = bars[i].close - bars[i - 1].close;
        if change > 0.0 {
            gains[i] = change;
        } else {
            losses[i] = -change;
        }
    }

    // Seed: simple mean over the first `period` deltas
    let mut avg_gain = gains[1..=period].iter().sum::<f64>() / period as f64;
    let mut avg_loss = losses[1..=period].iter().sum::<f64>() / period as f64;
    result[period] = rsi_value(avg_gain, avg_loss);

    // Wilder smoothing for subsequent values
    for i in (period + 1)..n {
        avg_gain = (avg_gain * (period as f64 - 1.0) + gains[i]) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + losses[i]) / period as f64;
        result[i] = rsi_value(avg_gain, avg_loss);
    }

    IndicatorResult::single(result)
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain > 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
