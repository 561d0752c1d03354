//! Indicator library — pure functions over a bar window.
//!
//! Every indicator takes an ordered window of bars (oldest → newest) plus its
//! periods and returns an [`IndicatorResult`]: one or more named series the
//! same length as the window, NaN-padded over the warm-up prefix. The latest
//! scalar of a series is what the compiled strategy reads per bar.
//!
//! Insufficient data is a warm-up condition, never an error: short windows,
//! empty input, and degenerate periods all yield an all-NaN result of
//! matching length.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod stochastic;

pub use bollinger::bollinger;
pub use ema::{ema, ema_of_series};
pub use macd::macd;
pub use rsi::rsi;
pub use sma::sma;
pub use stochastic::stochastic;

use std::collections::BTreeMap;

use crate::domain::{Bar, IndicatorData};

/// Output handle name used by single-series indicators.
pub const RESULT_HANDLE: &str = "result";

/// Computed indicator output: named series over the evaluation window.
///
/// Single-output indicators publish one series under [`RESULT_HANDLE`];
/// multi-output indicators publish one series per named handle (`macd`,
/// `signal`, `histogram`, …). `f64::NAN` marks warm-up / undefined positions.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorResult {
    outputs: BTreeMap<String, Vec<f64>>,
    len: usize,
}

impl IndicatorResult {
    /// Single-output result under the default `result` handle.
    pub fn single(values: Vec<f64>) -> Self {
        let len = values.len();
        let mut outputs = BTreeMap::new();
        outputs.insert(RESULT_HANDLE.to_string(), values);
        Self { outputs, len }
    }

    /// Multi-output result with explicit handle names.
    pub fn multi(series: Vec<(&str, Vec<f64>)>) -> Self {
        let len = series.first().map(|(_, v)| v.len()).unwrap_or(0);
        debug_assert!(series.iter().all(|(_, v)| v.len() == len));
        let outputs = series
            .into_iter()
            .map(|(name, values)| (name.to_string(), values))
            .collect();
        Self { outputs, len }
    }

    /// All-NaN single-output result of the given length.
    pub fn all_nan(len: usize) -> Self {
        Self::single(vec![f64::NAN; len])
    }

    /// Window length the result was computed over.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Full series for a handle, if the indicator publishes it.
    pub fn series(&self, handle: &str) -> Option<&[f64]> {
        self.outputs.get(handle).map(Vec::as_slice)
    }

    /// Latest scalar for a handle.
    ///
    /// An unknown handle falls back to the default `result` series, matching
    /// the editor's single-port convention; NaN when neither exists or the
    /// window is empty.
    pub fn latest(&self, handle: &str) -> f64 {
        let series = self
            .outputs
            .get(handle)
            .or_else(|| self.outputs.get(RESULT_HANDLE));
        match series {
            Some(values) => values.last().copied().unwrap_or(f64::NAN),
            None => f64::NAN,
        }
    }
}

/// Resolved indicator configuration for one indicator node.
///
/// Built from the node's editor data with the editor's per-indicator period
/// defaults filled in. An unrecognized `indicatorType` string becomes
/// [`IndicatorSpec::Unsupported`], which computes to all-NaN with a logged
/// warning rather than failing the run.
#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorSpec {
    Sma {
        period: usize,
    },
    Ema {
        period: usize,
    },
    Rsi {
        period: usize,
    },
    Macd {
        fast_period: usize,
        slow_period: usize,
        signal_period: usize,
    },
    Bollinger {
        period: usize,
        std_dev: f64,
    },
    Stochastic {
        k_period: usize,
        d_period: usize,
        slowing: usize,
    },
    Unsupported {
        type_name: String,
    },
}

impl IndicatorSpec {
    pub fn from_data(data: &IndicatorData) -> Self {
        match data.indicator_type.as_str() {
            "SMA" => IndicatorSpec::Sma {
                period: data.period.unwrap_or(20),
            },
            "EMA" => IndicatorSpec::Ema {
                period: data.period.unwrap_or(20),
            },
            "RSI" => IndicatorSpec::Rsi {
                period: data.period.unwrap_or(14),
            },
            "MACD" => IndicatorSpec::Macd {
                fast_period: data.fast_period.unwrap_or(12),
                slow_period: data.slow_period.unwrap_or(26),
                signal_period: data.signal_period.unwrap_or(9),
            },
            "BBANDS" => IndicatorSpec::Bollinger {
                period: data.period.unwrap_or(20),
                std_dev: data.std_dev.unwrap_or(2.0),
            },
            "STOCH" => IndicatorSpec::Stochastic {
                k_period: data.k_period.unwrap_or(14),
                d_period: data.d_period.unwrap_or(3),
                slowing: data.slowing.unwrap_or(3),
            },
            other => IndicatorSpec::Unsupported {
                type_name: other.to_string(),
            },
        }
    }

    /// Computes this indicator over the window.
    pub fn compute(&self, bars: &[Bar]) -> IndicatorResult {
        match self {
            IndicatorSpec::Sma { period } => sma(bars, *period),
            IndicatorSpec::Ema { period } => ema(bars, *period),
            IndicatorSpec::Rsi { period } => rsi(bars, *period),
            IndicatorSpec::Macd {
                fast_period,
                slow_period,
                signal_period,
            } => macd(bars, *fast_period, *slow_period, *signal_period),
            IndicatorSpec::Bollinger { period, std_dev } => bollinger(bars, *period, *std_dev),
            IndicatorSpec::Stochastic {
                k_period,
                d_period,
                slowing,
            } => stochastic(bars, *k_period, *d_period, *slowing),
            IndicatorSpec::Unsupported { type_name } => {
                tracing::warn!(indicator = %type_name, "unsupported indicator type, producing empty result");
                IndicatorResult::all_nan(bars.len())
            }
        }
    }
}

/// Default tolerance for indicator test assertions.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-9;

#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() <= epsilon,
        "expected {expected}, got {actual}"
    );
}

/// Create synthetic bars from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    use chrono::{Duration, TimeZone, Utc};
    let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            let high = open.max(close) + 1.0;
            let low = open.min(close) - 1.0;
            Bar {
                timestamp: base + Duration::days(i as i64),
                open,
                high,
                low,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}
