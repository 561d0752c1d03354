//! Stochastic Oscillator.
//!
//! Raw %K = 100 × (close - lowest_low) / (highest_high - lowest_low) over
//! k_period; the published %K is SMA-slowed over `slowing` bars; %D is the
//! SMA(d_period) of the slowed %K. A window whose high equals its low has no
//! defined %K at that position.

use super::IndicatorResult;
use crate::domain::Bar;

pub fn stochastic(
    bars: &[Bar],
    k_period: usize,
    d_period: usize,
    slowing: usize,
) -> IndicatorResult {
    let n = bars.len();
    let nan = || vec![f64::NAN; n];

    if k_period == 0 || d_period == 0 || slowing == 0 || n < k_period {
        return IndicatorResult::multi(vec![("k", nan()), ("d", nan())]);
    }

    // Raw %K
    let mut raw_k = nan();
    for i in (k_period - 1)..n {
        let window = &bars[(i + 1 - k_period)..=i];
        let highest = window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let lowest = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        let range = highest - lowest;
        if range > 0.0 {
            raw_k[i] = 100.0 * (bars[i].close - lowest) / range;
        }
    }

    let k = sma_of_defined(&raw_k, slowing);
    let d = sma_of_defined(&k, d_period);

    IndicatorResult::multi(vec![("k", k), ("d", d)])
}

/// SMA over a series that may have a NaN warm-up prefix: a position is
/// defined only when the whole averaging window is.
fn sma_of_defined(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }
    for i in (period - 1)..n {
        let window = &values[(i + 1 - period)..=i];
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        result[i] = window.iter().sum::<f64>() / period as f64;
    }
    result
}
