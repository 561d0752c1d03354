//! Trade — a completed round trip, recorded when a position closes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::position::PositionSide;

/// Immutable record of one entry → exit round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub entry_price: f64,
    pub exit_price: f64,
    pub side: PositionSide,
    pub quantity: f64,
    /// Net profit after commission, in account currency.
    pub profit: f64,
    /// Price return of the trade in percent, commission excluded.
    pub profit_pct: f64,
    /// Total commission paid across both fills.
    pub commission: f64,
    /// Holding time in seconds.
    pub duration_secs: i64,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.profit > 0.0
    }
}
