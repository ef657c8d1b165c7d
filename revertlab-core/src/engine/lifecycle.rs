//! Trade lifecycle state machine.
//!
//! One pass over the bars, carrying a `Phase` from bar to bar. The signal
//! read at bar i is the one admitted at bar i-1, so nothing decided from
//! bar i's close acts before bar i+1.
//!
//! # Transition table (evaluated at bar i >= 1, in this order)
//!
//! | phase at i-1                     | condition at i                          | result at i                                       |
//! |----------------------------------|-----------------------------------------|---------------------------------------------------|
//! | `ExitPending { fill }`           | always                                  | exit_price = fill, `Flat`; nothing else this bar  |
//! | `Flat` / `Holding(other side)`   | signal[i-1] for a side not held         | (reversal: exit_price = open) open at open, stop = policy entry level |
//! | `Holding(d, stop)` (incl. just opened) | low <= stop (long) / high >= stop (short) | `ExitPending { fill = max(low, stop) / min(high, stop) }`; entry_price cleared if opened this bar |
//! | `Holding(d, stop)`               | no breach                               | stop = policy trail (tighten only)                |
//! | `Flat`                           | no signal                               | `Flat`                                            |
//!
//! Bar 0 is always `Flat` with no events.

use crate::components::filter::Signal;
use crate::components::indicator::IndicatorValues;
use crate::components::stop::StopPolicy;
use crate::domain::{Bar, Direction, TradeState};

use super::EngineError;

/// Position phase carried between bars.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    Flat,
    Holding {
        direction: Direction,
        stop: f64,
    },
    /// Stop breached at the close of the previous bar; the exit is realised
    /// on the next bar at `fill`.
    ExitPending {
        direction: Direction,
        stop: f64,
        fill: f64,
    },
}

impl Phase {
    pub fn direction(&self) -> Direction {
        match *self {
            Phase::Flat => Direction::Flat,
            Phase::Holding { direction, .. } | Phase::ExitPending { direction, .. } => direction,
        }
    }

    pub fn stop(&self) -> Option<f64> {
        match *self {
            Phase::Flat => None,
            Phase::Holding { stop, .. } | Phase::ExitPending { stop, .. } => Some(stop),
        }
    }

    fn snapshot(&self) -> TradeState {
        TradeState {
            direction: self.direction(),
            in_trade: !matches!(self, Phase::Flat),
            stop_level: self.stop(),
            entry_price: None,
            exit_price: None,
        }
    }
}

/// Side a signal asks for, given the side currently held. Bullish wins ties.
fn requested_side(signal: Signal, held: Direction) -> Option<Direction> {
    if signal.bullish && held != Direction::Long {
        Some(Direction::Long)
    } else if signal.bearish && held != Direction::Short {
        Some(Direction::Short)
    } else {
        None
    }
}

fn breached(direction: Direction, bar: &Bar, stop: f64) -> Option<f64> {
    match direction {
        Direction::Long if bar.low <= stop => Some(bar.low.max(stop)),
        Direction::Short if bar.high >= stop => Some(bar.high.min(stop)),
        _ => None,
    }
}

/// Run the state machine over `bars` with admitted `signals` (same length).
pub fn run_lifecycle(
    bars: &[Bar],
    signals: &[Signal],
    stop_policy: &dyn StopPolicy,
    indicators: &IndicatorValues,
) -> Result<Vec<TradeState>, EngineError> {
    if bars.len() != signals.len() {
        return Err(EngineError::InvalidInput(format!(
            "{} bars but {} signals",
            bars.len(),
            signals.len()
        )));
    }

    let mut states = Vec::with_capacity(bars.len());
    if bars.is_empty() {
        return Ok(states);
    }
    states.push(TradeState::flat());

    let mut phase = Phase::Flat;

    for (i, bar) in bars.iter().enumerate().skip(1) {
        if let Phase::ExitPending { fill, .. } = phase {
            phase = Phase::Flat;
            states.push(TradeState {
                exit_price: Some(fill),
                ..TradeState::flat()
            });
            continue;
        }

        let mut exit_price = None;
        let mut entry_price = None;

        if let Some(side) = requested_side(signals[i - 1], phase.direction()) {
            if !bar.open.is_finite() {
                return Err(EngineError::InvalidInput(format!(
                    "non-finite open {} at entry bar {i}",
                    bar.open
                )));
            }
            if matches!(phase, Phase::Holding { .. }) {
                exit_price = Some(bar.open);
            }
            let stop = stop_policy.on_entry(side, bars, i, bar.open, indicators)?;
            phase = Phase::Holding {
                direction: side,
                stop,
            };
            entry_price = Some(bar.open);
        }

        if let Phase::Holding { direction, stop } = phase {
            match breached(direction, bar, stop) {
                Some(fill) => {
                    phase = Phase::ExitPending {
                        direction,
                        stop,
                        fill,
                    };
                    // Opened and stopped on the same bar: no realised entry.
                    entry_price = None;
                }
                None => {
                    let trailed = stop_policy.on_bar(direction, bars, i, stop, indicators);
                    phase = Phase::Holding {
                        direction,
                        stop: trailed,
                    };
                }
            }
        }

        states.push(TradeState {
            entry_price,
            exit_price,
            ..phase.snapshot()
        });
    }

    Ok(states)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::stop::FixedStop;
    use crate::indicators::make_ohlc_bars;

    fn bull() -> Signal {
        Signal {
            bullish: true,
            bearish: false,
        }
    }

    fn bear() -> Signal {
        Signal {
            bullish: false,
            bearish: true,
        }
    }

    fn quiet_bars(n: usize) -> Vec<Bar> {
        make_ohlc_bars(&vec![(100.0, 101.0, 99.0, 100.0); n])
    }

    #[test]
    fn bar_zero_flat_and_flat_without_signals() {
        let bars = quiet_bars(5);
        let states = run_lifecycle(&bars, &[Signal::none(); 5], &FixedStop::default(), &IndicatorValues::new())
            .unwrap();
        assert_eq!(states.len(), 5);
        assert!(states.iter().all(|s| *s == TradeState::flat()));
    }

    #[test]
    fn signal_acts_on_next_bar_open() {
        let bars = quiet_bars(4);
        let mut signals = vec![Signal::none(); 4];
        signals[1] = bull();
        let states = run_lifecycle(&bars, &signals, &FixedStop::default(), &IndicatorValues::new()).unwrap();
        assert!(!states[1].in_trade);
        assert_eq!(states[2].direction, Direction::Long);
        assert_eq!(states[2].entry_price, Some(100.0));
        // Signal bar low 99 - 1
        assert_eq!(states[2].stop_level, Some(98.0));
        assert_eq!(states[3].entry_price, None);
        assert!(states[3].in_trade);
    }

    #[test]
    fn signal_on_last_bar_never_acts() {
        let bars = quiet_bars(3);
        let mut signals = vec![Signal::none(); 3];
        signals[2] = bull();
        let states = run_lifecycle(&bars, &signals, &FixedStop::default(), &IndicatorValues::new()).unwrap();
        assert!(states.iter().all(|s| !s.in_trade));
    }

    #[test]
    fn reversal_exits_and_enters_at_open() {
        let bars = quiet_bars(5);
        let mut signals = vec![Signal::none(); 5];
        signals[0] = bull();
        signals[2] = bear();
        let states = run_lifecycle(&bars, &signals, &FixedStop::default(), &IndicatorValues::new()).unwrap();
        assert_eq!(states[1].direction, Direction::Long);
        assert_eq!(states[3].direction, Direction::Short);
        assert_eq!(states[3].exit_price, Some(100.0));
        assert_eq!(states[3].entry_price, Some(100.0));
        assert_eq!(states[3].stop_level, Some(102.0));
    }

    #[test]
    fn same_side_signal_is_ignored_while_held() {
        let bars = quiet_bars(4);
        let signals = vec![bull(); 4];
        let states = run_lifecycle(&bars, &signals, &FixedStop::default(), &IndicatorValues::new()).unwrap();
        assert_eq!(states[1].entry_price, Some(100.0));
        assert_eq!(states[2].entry_price, None);
        assert_eq!(states[3].entry_price, None);
    }

    #[test]
    fn same_bar_stop_out_clears_entry_and_exits_next_bar() {
        let bars = make_ohlc_bars(&[
            (100.0, 101.0, 99.5, 100.0),
            (100.0, 100.5, 97.0, 97.5), // low 97 <= stop 98.5
            (97.5, 98.0, 96.0, 97.0),
        ]);
        let mut signals = vec![Signal::none(); 3];
        signals[0] = bull();
        let states = run_lifecycle(&bars, &signals, &FixedStop::default(), &IndicatorValues::new()).unwrap();

        assert_eq!(states[1].entry_price, None);
        assert_eq!(states[1].exit_price, None);
        assert!(states[1].in_trade);
        assert_eq!(states[1].direction, Direction::Long);

        assert_eq!(states[2].exit_price, Some(98.5));
        assert_eq!(states[2].direction, Direction::Flat);
        assert!(!states[2].in_trade);
        assert_eq!(states[2].stop_level, None);
    }

    #[test]
    fn pending_exit_blocks_entry_on_exit_bar() {
        let bars = make_ohlc_bars(&[
            (100.0, 101.0, 99.5, 100.0),
            (100.0, 100.5, 97.0, 97.5),
            (97.5, 98.0, 96.0, 97.0),
            (97.0, 98.0, 96.5, 97.5),
        ]);
        let mut signals = vec![Signal::none(); 4];
        signals[0] = bull();
        signals[1] = bear();
        let states = run_lifecycle(&bars, &signals, &FixedStop::default(), &IndicatorValues::new()).unwrap();
        // Bar 2 realises the pending exit; the bearish signal from bar 1 is dropped.
        assert_eq!(states[2].exit_price, Some(98.5));
        assert_eq!(states[2].entry_price, None);
        assert_eq!(states[2].direction, Direction::Flat);
        assert_eq!(states[3].direction, Direction::Flat);
    }

    #[test]
    fn short_fill_is_min_of_high_and_stop() {
        let bars = make_ohlc_bars(&[
            (100.0, 100.5, 99.0, 100.0),
            (100.0, 100.8, 99.0, 99.5),
            (99.5, 104.0, 99.0, 103.0), // high 104 >= stop 101.5
            (103.0, 103.5, 102.0, 103.0),
        ]);
        let mut signals = vec![Signal::none(); 4];
        signals[0] = bear();
        let states = run_lifecycle(&bars, &signals, &FixedStop::default(), &IndicatorValues::new()).unwrap();
        assert_eq!(states[1].entry_price, Some(100.0));
        assert_eq!(states[1].stop_level, Some(101.5));
        assert!(states[2].in_trade);
        assert_eq!(states[3].exit_price, Some(101.5));
    }

    #[test]
    fn mismatched_lengths_rejected() {
        let bars = quiet_bars(3);
        let err = run_lifecycle(&bars, &[Signal::none(); 2], &FixedStop::default(), &IndicatorValues::new())
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[test]
    fn non_finite_open_on_entry_rejected() {
        let mut bars = quiet_bars(3);
        bars[1].open = f64::NAN;
        let mut signals = vec![Signal::none(); 3];
        signals[0] = bull();
        let err = run_lifecycle(&bars, &signals, &FixedStop::default(), &IndicatorValues::new())
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }
}
