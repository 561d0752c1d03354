//! Bar — the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One OHLCV candle for a fixed timeframe.
///
/// Bars arrive from the market-data collaborator already sorted ascending by
/// timestamp with no duplicates; `validate_series` enforces that contract at
/// the engine boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Basic OHLCV sanity check: high >= low, high/low bracket open and close.
    pub fn is_sane(&self) -> bool {
        !self.open.is_nan()
            && !self.high.is_nan()
            && !self.low.is_nan()
            && !self.close.is_nan()
            && self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }

    /// Returns the named price field, or `None` for an unknown field name.
    ///
    /// Field names match the price node's output handles: `open`, `high`,
    /// `low`, `close`, `volume`.
    pub fn field(&self, name: &str) -> Option<f64> {
        match name {
            "open" => Some(self.open),
            "high" => Some(self.high),
            "low" => Some(self.low),
            "close" => Some(self.close),
            "volume" => Some(self.volume),
            _ => None,
        }
    }
}

/// Why a bar series was rejected by [`validate_series`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SeriesError {
    #[error("bar series is empty")]
    Empty,
    #[error("bar series is not sorted ascending at index {0}")]
    Unsorted(usize),
    #[error("duplicate timestamp at index {0}")]
    DuplicateTimestamp(usize),
}

/// Validates the ordering contract of a historical series.
///
/// Timestamps must be strictly ascending. Gap-free-ness is not checked — the
/// engine's bars-per-year inference tolerates calendar gaps.
pub fn validate_series(bars: &[Bar]) -> Result<(), SeriesError> {
    if bars.is_empty() {
        return Err(SeriesError::Empty);
    }
    for i in 1..bars.len() {
        if bars[i].timestamp < bars[i - 1].timestamp {
            return Err(SeriesError::Unsorted(i));
        }
        if bars[i].timestamp == bars[i - 1].timestamp {
            return Err(SeriesError::DuplicateTimestamp(i));
        }
    }
    Ok(())
}
