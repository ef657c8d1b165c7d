//! Stop policies — place the protective stop at entry and trail it while held.
//!
//! # Ratchet invariant
//! A held stop may tighten but never loosen: longs take the max of the old
//! and proposed level, shorts the min. Policies apply `ratchet` themselves so
//! the engine never has to trust a raw proposal.

pub mod atr_trailing;
pub mod fixed;

pub use atr_trailing::AtrTrailingStop;
pub use fixed::FixedStop;

use crate::domain::{Bar, Direction};
use thiserror::Error;

use super::indicator::IndicatorValues;

#[derive(Debug, Error, PartialEq)]
pub enum StopError {
    #[error("{policy}: stop undefined at bar {bar_index} ({reason})")]
    Undefined {
        policy: &'static str,
        bar_index: usize,
        reason: String,
    },
}

/// Trait for stop policies.
///
/// Policies see bars and precomputed indicators up to `bar_index`, never
/// signals or future bars.
pub trait StopPolicy: Send + Sync {
    fn name(&self) -> &str;

    /// Initial stop for a `direction` position opened at bar `bar_index`
    /// for `entry_price`. Fails when the inputs it needs are not finite.
    fn on_entry(
        &self,
        direction: Direction,
        bars: &[Bar],
        bar_index: usize,
        entry_price: f64,
        indicators: &IndicatorValues,
    ) -> Result<f64, StopError>;

    /// Stop carried past bar `bar_index` for a position that survived it.
    /// Must never loosen `current_stop`.
    fn on_bar(
        &self,
        direction: Direction,
        bars: &[Bar],
        bar_index: usize,
        current_stop: f64,
        indicators: &IndicatorValues,
    ) -> f64;
}

/// Tighten-only update of a stop level.
pub fn ratchet(direction: Direction, current: f64, proposed: f64) -> f64 {
    if proposed.is_nan() {
        return current;
    }
    match direction {
        Direction::Long => current.max(proposed),
        Direction::Short => current.min(proposed),
        Direction::Flat => current,
    }
}
