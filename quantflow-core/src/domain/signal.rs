//! Signal — an entry or exit instruction emitted for one bar.

use serde::{Deserialize, Serialize};

use super::position::PositionSide;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalAction {
    #[serde(rename = "ENTRY")]
    Entry,
    #[serde(rename = "EXIT")]
    Exit,
}

/// Transient per-bar instruction produced by a compiled strategy.
///
/// `price` is the close of the bar that triggered the signal; the engine
/// fills at that price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub action: SignalAction,
    #[serde(rename = "positionType")]
    pub side: PositionSide,
    pub price: f64,
}
