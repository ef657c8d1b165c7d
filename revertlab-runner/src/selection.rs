//! Choosing the in-sample parameter set that goes on to out-of-sample
//! validation.
//!
//! `AutoSelector` takes the top-ranked result. `ManualSelector` shows the
//! operator a shortlist and reads one value per parameter, accepting only
//! values present on that parameter's grid axis.

use std::io::{self, BufRead, Write};

use thiserror::Error;

use crate::params::{ParamGrid, ParameterSet};
use crate::runner::BacktestResult;

#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("no ranked results to select from")]
    NothingToSelect,
    #[error("operator input closed before a selection was made")]
    InputClosed,
    #[error("i/o error during selection: {0}")]
    Io(#[from] io::Error),
}

/// Picks one parameter set from a window's ranked in-sample results.
pub trait Selector {
    fn select(
        &mut self,
        window_index: usize,
        ranked: &[BacktestResult],
        grid: &ParamGrid,
    ) -> Result<ParameterSet, SelectionError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AutoSelector;

impl Selector for AutoSelector {
    fn select(
        &mut self,
        _window_index: usize,
        ranked: &[BacktestResult],
        _grid: &ParamGrid,
    ) -> Result<ParameterSet, SelectionError> {
        ranked
            .first()
            .map(|r| r.params.clone())
            .ok_or(SelectionError::NothingToSelect)
    }
}

/// Interactive selection over any line-based reader/writer pair.
pub struct ManualSelector<R, W> {
    input: R,
    output: W,
    shortlist: usize,
}

impl<R: BufRead, W: Write> ManualSelector<R, W> {
    pub fn new(input: R, output: W, shortlist: usize) -> Self {
        Self {
            input,
            output,
            shortlist: shortlist.max(1),
        }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn print_shortlist(
        &mut self,
        window_index: usize,
        ranked: &[BacktestResult],
    ) -> io::Result<()> {
        let shown = ranked.len().min(self.shortlist);
        writeln!(
            self.output,
            "Window {}: top {shown} of {} in-sample results",
            window_index + 1,
            ranked.len()
        )?;
        for (i, r) in ranked.iter().take(shown).enumerate() {
            let s = &r.stats;
            writeln!(
                self.output,
                "  #{} {} | sharpe {:.4} sortino {:.4} calmar {:.4} return {:.2}% trades {}",
                i + 1,
                r.params,
                s.sharpe,
                s.sortino,
                s.calmar,
                s.total_return_pct,
                s.total_trades
            )?;
        }
        Ok(())
    }

    /// Prompt until the operator enters a value on `axis`.
    fn read_value(&mut self, name: &str, axis: &[f64], grid: &ParamGrid) -> Result<f64, SelectionError> {
        let choices = axis
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        loop {
            write!(self.output, "{name} [{choices}]: ")?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Err(SelectionError::InputClosed);
            }
            let entered = line.trim();
            match entered.parse::<f64>().ok().and_then(|v| grid.snap(name, v)) {
                Some(v) => return Ok(v),
                None => writeln!(
                    self.output,
                    "'{entered}' is not a value of {name}; choose one of [{choices}]"
                )?,
            }
        }
    }
}

impl<R: BufRead, W: Write> Selector for ManualSelector<R, W> {
    fn select(
        &mut self,
        window_index: usize,
        ranked: &[BacktestResult],
        grid: &ParamGrid,
    ) -> Result<ParameterSet, SelectionError> {
        if ranked.is_empty() {
            return Err(SelectionError::NothingToSelect);
        }
        self.print_shortlist(window_index, ranked)?;

        let names: Vec<String> = grid.names().map(str::to_string).collect();
        let mut chosen = Vec::with_capacity(names.len());
        for name in names {
            let axis = grid.axis(&name).unwrap_or_default().to_vec();
            let value = self.read_value(&name, &axis, grid)?;
            chosen.push((name, value));
        }
        Ok(chosen.into_iter().collect())
    }
}
