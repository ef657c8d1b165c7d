//! Position timeline and the execution signals derived from it.

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, Direction, TradeState};

/// Per-bar trade states for one run, index-aligned with the bars.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Timeline {
    states: Vec<TradeState>,
}

impl Timeline {
    pub fn new(states: Vec<TradeState>) -> Self {
        Self { states }
    }

    pub fn states(&self) -> &[TradeState] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn directions(&self) -> Vec<Direction> {
        self.states.iter().map(|s| s.direction).collect()
    }

    pub fn entry_count(&self) -> usize {
        self.states.iter().filter(|s| s.has_entry()).count()
    }

    pub fn exit_count(&self) -> usize {
        self.states.iter().filter(|s| s.has_exit()).count()
    }

    /// Entry/exit flags and execution prices for a from-signals portfolio.
    ///
    /// - long entry at i: direction is Long at i and was not Long at i-1
    /// - long exit at i: an exit executes at i and the position at i-1 was Long
    /// - execution price: the exit price when one executes, else the bar's open
    ///
    /// Short flags mirror the long ones. Bar 0 carries no flags.
    pub fn execution_signals(&self, bars: &[Bar]) -> ExecutionSignals {
        let n = self.states.len().min(bars.len());
        let mut out = ExecutionSignals::with_len(n);

        for i in 0..n {
            let state = &self.states[i];
            out.prices[i] = state.exit_price.unwrap_or(bars[i].open);
            if i == 0 {
                continue;
            }
            let prev = self.states[i - 1].direction;
            let curr = state.direction;
            out.long_entries[i] = curr == Direction::Long && prev != Direction::Long;
            out.short_entries[i] = curr == Direction::Short && prev != Direction::Short;
            if state.has_exit() {
                out.long_exits[i] = prev == Direction::Long;
                out.short_exits[i] = prev == Direction::Short;
            }
        }

        out
    }
}

/// Boolean entry/exit series plus execution prices, all the same length.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExecutionSignals {
    pub prices: Vec<f64>,
    pub long_entries: Vec<bool>,
    pub short_entries: Vec<bool>,
    pub long_exits: Vec<bool>,
    pub short_exits: Vec<bool>,
}

impl ExecutionSignals {
    fn with_len(n: usize) -> Self {
        Self {
            prices: vec![f64::NAN; n],
            long_entries: vec![false; n],
            short_entries: vec![false; n],
            long_exits: vec![false; n],
            short_exits: vec![false; n],
        }
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Number of entries of either side.
    pub fn entry_count(&self) -> usize {
        self.long_entries
            .iter()
            .zip(&self.short_entries)
            .filter(|(l, s)| **l || **s)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    fn state(direction: Direction, entry: Option<f64>, exit: Option<f64>) -> TradeState {
        TradeState {
            direction,
            in_trade: direction != Direction::Flat,
            stop_level: None,
            entry_price: entry,
            exit_price: exit,
        }
    }

    #[test]
    fn derives_flags_from_direction_changes() {
        let bars = make_bars(&[100.0, 101.0, 102.0, 103.0, 104.0, 105.0]);
        let timeline = Timeline::new(vec![
            state(Direction::Flat, None, None),
            state(Direction::Long, Some(100.0), None),
            state(Direction::Long, None, None),
            state(Direction::Short, Some(102.0), Some(102.0)),
            state(Direction::Short, None, None),
            state(Direction::Flat, None, Some(103.5)),
        ]);
        let sig = timeline.execution_signals(&bars);

        assert_eq!(sig.long_entries, vec![false, true, false, false, false, false]);
        assert_eq!(sig.short_entries, vec![false, false, false, true, false, false]);
        assert_eq!(sig.long_exits, vec![false, false, false, true, false, false]);
        assert_eq!(sig.short_exits, vec![false, false, false, false, false, true]);
        assert_eq!(sig.prices[5], 103.5);
        assert_eq!(sig.prices[4], bars[4].open);
        assert_eq!(sig.entry_count(), 2);
    }

    #[test]
    fn counts_events() {
        let timeline = Timeline::new(vec![
            state(Direction::Flat, None, None),
            state(Direction::Long, Some(1.0), None),
            state(Direction::Flat, None, Some(2.0)),
        ]);
        assert_eq!(timeline.entry_count(), 1);
        assert_eq!(timeline.exit_count(), 1);
        assert_eq!(
            timeline.directions(),
            vec![Direction::Flat, Direction::Long, Direction::Flat]
        );
    }
}
