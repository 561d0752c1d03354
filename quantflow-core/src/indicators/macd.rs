//! Moving Average Convergence Divergence (MACD).
//!
//! macd = EMA(fast) - EMA(slow), aligned by index (NaN until both defined).
//! signal = EMA(signal_period) of the macd line's defined suffix, re-aligned
//! to the original index positions.
//! histogram = macd - signal where both defined.
//!
//! Requires fast_period < slow_period; anything else yields an all-NaN result.

use super::ema::ema_of_series;
use super::IndicatorResult;
use crate::domain::Bar;

pub fn macd(
    bars: &[Bar],
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
) -> IndicatorResult {
    let n = bars.len();
    let nan = || vec![f64::NAN; n];

    if fast_period == 0 || signal_period == 0 || fast_period >= slow_period {
        return IndicatorResult::multi(vec![("macd", nan()), ("signal", nan()), ("histogram", nan())]);
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let fast = ema_of_series(&closes, fast_period);
    let slow = ema_of_series(&closes, slow_period);

    let mut macd_line = nan();
    for i in 0..n {
        if !fast[i].is_nan() && !slow[i].is_nan() {
            macd_line[i] = fast[i] - slow[i];
        }
    }

    // Signal line: EMA over the defined macd suffix, shifted back into place.
    // The macd line is NaN exactly on [0, slow_period-1), so the suffix is
    // contiguous.
    let offset = macd_line.iter().position(|v| !v.is_nan());
    let mut signal_line = nan();
    if let Some(offset) = offset {
        let defined = &macd_line[offset..];
        let sig = ema_of_series(defined, signal_period);
        for (i, value) in sig.into_iter().enumerate() {
            signal_line[offset + i] = value;
        }
    }

    let mut histogram = nan();
    for i in 0..n {
        if !macd_line[i].is_nan() && !signal_line[i].is_nan() {
            histogram[i] = macd_line[i] - signal_line[i];
        }
    }

    IndicatorResult::multi(vec![
        ("macd", macd_line),
        ("signal", signal_line),
        ("histogram", histogram),
    ])
}
