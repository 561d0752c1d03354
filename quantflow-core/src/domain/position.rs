//! Position — the single open holding of the simulation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of a position. Serialized as the editor's `LONG`/`SHORT` strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionSide {
    #[serde(rename = "LONG")]
    Long,
    #[serde(rename = "SHORT")]
    Short,
}

/// An open position. The engine holds at most one at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub side: PositionSide,
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
    pub quantity: f64,
}

impl Position {
    /// Unrealized price move per unit, signed in the position's favor.
    pub fn price_move(&self, exit_price: f64) -> f64 {
        match self.side {
            PositionSide::Long => exit_price - self.entry_price,
            PositionSide::Short => self.entry_price - exit_price,
        }
    }
}
