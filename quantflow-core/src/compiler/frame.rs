//! Frame — the per-bar evaluation context fed to a compiled strategy.

use std::collections::HashMap;

use crate::domain::{Bar, NodeId};
use crate::indicators::IndicatorResult;

/// Indicator outputs for one bar, keyed by the indicator node that produced
/// them.
pub type IndicatorSnapshot = HashMap<NodeId, IndicatorResult>;

/// Everything a compiled strategy can see while evaluating one bar.
///
/// `indicators` reflects data through and including `current`;
/// `previous_indicators` reflects the state as of `previous` — crossover
/// conditions compare the two.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub current: &'a Bar,
    pub previous: Option<&'a Bar>,
    pub indicators: &'a IndicatorSnapshot,
    pub previous_indicators: &'a IndicatorSnapshot,
}
