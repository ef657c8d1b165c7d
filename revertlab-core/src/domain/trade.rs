//! Per-bar trade state produced by the lifecycle engine.

use serde::{Deserialize, Serialize};

/// Position direction held at the close of a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Flat,
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short, 0 when flat.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Flat => 0.0,
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }

    pub fn is_flat(self) -> bool {
        self == Direction::Flat
    }
}

/// Snapshot of the position after bar `i` has been processed.
///
/// `entry_price` and `exit_price` are event fields: they are set only on the
/// bar where the event executes. `in_trade` stays true while a stop-out is
/// pending, and `direction` keeps the side until the exit bar.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TradeState {
    pub direction: Direction,
    pub in_trade: bool,
    pub stop_level: Option<f64>,
    pub entry_price: Option<f64>,
    pub exit_price: Option<f64>,
}

impl TradeState {
    /// Flat, no stop, no events.
    pub fn flat() -> Self {
        Self::default()
    }

    pub fn has_entry(&self) -> bool {
        self.entry_price.is_some()
    }

    pub fn has_exit(&self) -> bool {
        self.exit_price.is_some()
    }
}
