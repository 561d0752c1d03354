//! Bollinger Bands.
//!
//! middle = SMA(period); upper/lower = middle ± std_dev × σ, where σ is the
//! population standard deviation of closes over the window.

use super::IndicatorResult;
use crate::domain::Bar;

pub fn bollinger(bars: &[Bar], period: usize, std_dev: f64) -> IndicatorResult {
    let n = bars.len();
    let mut middle = vec![f64::NAN; n];
    let mut upper = vec![f64::NAN; n];
    let mut lower = vec![f64::NAN; n];

    if period == 0 || n < period {
        return IndicatorResult::multi(vec![("upper", upper), ("middle", middle), ("lower", lower)]);
    }

    for i in (period - 1)..n {
        let window = &bars[(i + 1 - period)..=i];
        let mean = window.iter().map(|b| b.close).sum::<f64>() / period as f64;
        let variance = window
            .iter()
            .map(|b| (b.close - mean).powi(2))
            .sum::<f64>()
            / period as f64;
        let sigma = variance.sqrt();

        middle[i] = mean;
        upper[i] = mean + sigma * std_dev;
        lower[i] = mean - sigma * std_dev;
    }

    IndicatorResult::multi(vec![("upper", upper), ("middle", middle), ("lower", lower)])
}
