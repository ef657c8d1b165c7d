//! Reference backtest collaborator: a single-position, all-in portfolio
//! driven by entry/exit signals.
//!
//! Per bar, in order:
//! 1. exits: a held long closes on `long_exits`, a held short on `short_exits`
//! 2. entries: when flat, `long_entries` opens a long, else `short_entries` a short
//! 3. mark equity at the bar's execution price
//!
//! Every fill pays `fees` on its notional. Positions are sized so the entry
//! consumes all available equity including the fee.

use crate::backtest::{BacktestEngine, BacktestError, PortfolioSettings, PortfolioStats, SignalInput};
use crate::metrics;

#[derive(Debug, Clone, Copy, Default)]
pub struct SignalPortfolio;

/// Position held between bars. `units` is negative for shorts.
#[derive(Debug, Clone, Copy)]
struct Holding {
    units: f64,
    equity_at_entry: f64,
}

/// Equity curve and closed-trade P&L of one simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct Simulation {
    pub equity: Vec<f64>,
    pub trade_pnls: Vec<f64>,
    pub open_at_end: bool,
}

impl SignalPortfolio {
    pub fn simulate(
        &self,
        input: &SignalInput<'_>,
        settings: &PortfolioSettings,
    ) -> Result<Simulation, BacktestError> {
        input.validate()?;
        settings.validate()?;

        let fee = settings.fees;
        let mut cash = settings.init_cash;
        let mut holding: Option<Holding> = None;
        let mut equity = Vec::with_capacity(input.len());
        let mut trade_pnls = Vec::new();

        for i in 0..input.len() {
            let price = input.prices[i];
            if !price.is_finite() || price <= 0.0 {
                return Err(BacktestError::NonFinitePrice {
                    bar_index: i,
                    price,
                });
            }

            if let Some(h) = holding {
                let close_long = h.units > 0.0 && input.long_exits[i];
                let close_short = h.units < 0.0 && input.short_exits[i];
                if close_long || close_short {
                    cash += h.units * price - h.units.abs() * price * fee;
                    trade_pnls.push(cash - h.equity_at_entry);
                    holding = None;
                }
            }

            if holding.is_none() {
                let side = if input.long_entries[i] {
                    1.0
                } else if input.short_entries[i] {
                    -1.0
                } else {
                    0.0
                };
                if side != 0.0 {
                    let equity_at_entry = cash;
                    let qty = cash / (price * (1.0 + fee));
                    let units = side * qty;
                    cash -= units * price + qty * price * fee;
                    holding = Some(Holding {
                        units,
                        equity_at_entry,
                    });
                }
            }

            let position_value = holding.map_or(0.0, |h| h.units * price);
            equity.push(cash + position_value);
        }

        Ok(Simulation {
            equity,
            trade_pnls,
            open_at_end: holding.is_some(),
        })
    }
}

impl BacktestEngine for SignalPortfolio {
    fn name(&self) -> &str {
        "signal_portfolio"
    }

    fn run(
        &self,
        input: &SignalInput<'_>,
        settings: &PortfolioSettings,
    ) -> Result<PortfolioStats, BacktestError> {
        let sim = self.simulate(input, settings)?;
        let ppy = settings.freq.periods_per_year();
        let eq = &sim.equity;
        let n = input.len();

        Ok(PortfolioStats {
            start: input.timestamps[0],
            end: input.timestamps[n - 1],
            total_return_pct: metrics::total_return(eq) * 100.0,
            benchmark_return_pct: (input.prices[n - 1] / input.prices[0] - 1.0) * 100.0,
            max_drawdown_pct: -metrics::max_drawdown(eq) * 100.0,
            win_rate_pct: metrics::win_rate(&sim.trade_pnls).map(|w| w * 100.0),
            sharpe: metrics::sharpe_ratio(eq, ppy),
            sortino: metrics::sortino_ratio(eq, ppy),
            calmar: metrics::calmar_ratio(eq, ppy),
            total_trades: sim.trade_pnls.len() + usize::from(sim.open_at_end),
            closed_trades: sim.trade_pnls.len(),
        })
    }
}
