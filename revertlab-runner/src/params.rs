//! Parameter sets and the grid they are enumerated from.
//!
//! A grid maps each parameter name to an axis of candidate values; the
//! Cartesian product of all axes is the list of `ParameterSet`s to evaluate.
//! Axes are kept in name order, and the last axis varies fastest.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tolerance used when matching a typed value against an axis, and when
/// deciding whether a range's `stop` is reached.
pub const VALUE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Error, PartialEq)]
pub enum GridError {
    #[error("grid has no parameters")]
    Empty,

    #[error("axis '{0}' has no values")]
    EmptyAxis(String),

    #[error("axis '{name}' has non-finite value {value}")]
    NonFinite { name: String, value: f64 },

    #[error("axis '{name}': step must be positive and stop >= start (start={start}, stop={stop}, step={step})")]
    BadRange {
        name: String,
        start: f64,
        stop: f64,
        step: f64,
    },
}

// ─── ParameterSet ───────────────────────────────────────────────────

/// Named numeric knobs for one backtest. Immutable once built.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(BTreeMap<String, f64>);

impl ParameterSet {
    pub fn new(values: BTreeMap<String, f64>) -> Self {
        Self(values)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn values(&self) -> &BTreeMap<String, f64> {
        &self.0
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, value) in &self.0 {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{name}={value}")?;
            first = false;
        }
        Ok(())
    }
}

// ─── Axes ───────────────────────────────────────────────────────────

/// One axis as written in config: an explicit list, or an inclusive range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamAxis {
    Values(Vec<f64>),
    Range { start: f64, stop: f64, step: f64 },
}

impl ParamAxis {
    pub fn range(start: f64, stop: f64, step: f64) -> Self {
        ParamAxis::Range { start, stop, step }
    }

    /// Expand to concrete values. A range includes `stop` when it lands on
    /// the step grid within tolerance; values are rebuilt from `start + k*step`
    /// so float drift does not accumulate.
    pub fn expand(&self, name: &str) -> Result<Vec<f64>, GridError> {
        let values = match *self {
            ParamAxis::Values(ref v) => v.clone(),
            ParamAxis::Range { start, stop, step } => {
                if !(start.is_finite() && stop.is_finite() && step.is_finite())
                    || step <= 0.0
                    || stop < start
                {
                    return Err(GridError::BadRange {
                        name: name.to_string(),
                        start,
                        stop,
                        step,
                    });
                }
                let count = ((stop - start) / step + VALUE_TOLERANCE).floor() as usize + 1;
                (0..count).map(|k| start + k as f64 * step).collect()
            }
        };
        if values.is_empty() {
            return Err(GridError::EmptyAxis(name.to_string()));
        }
        if let Some(&value) = values.iter().find(|v| !v.is_finite()) {
            return Err(GridError::NonFinite {
                name: name.to_string(),
                value,
            });
        }
        Ok(values)
    }
}

// ─── ParamGrid ──────────────────────────────────────────────────────

/// Expanded grid: every axis as concrete values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    axes: BTreeMap<String, Vec<f64>>,
}

impl ParamGrid {
    pub fn from_axes(axes: &BTreeMap<String, ParamAxis>) -> Result<Self, GridError> {
        if axes.is_empty() {
            return Err(GridError::Empty);
        }
        let expanded = axes
            .iter()
            .map(|(name, axis)| axis.expand(name).map(|v| (name.clone(), v)))
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        Ok(Self { axes: expanded })
    }

    pub fn axis(&self, name: &str) -> Option<&[f64]> {
        self.axes.get(name).map(|v| v.as_slice())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.axes.keys().map(|k| k.as_str())
    }

    /// The axis value matching `value` within tolerance, if any.
    pub fn snap(&self, name: &str, value: f64) -> Option<f64> {
        self.axis(name)?
            .iter()
            .copied()
            .find(|v| (v - value).abs() <= VALUE_TOLERANCE * v.abs().max(1.0))
    }

    /// Number of combinations in the Cartesian product.
    pub fn size(&self) -> usize {
        self.axes.values().map(|v| v.len()).product()
    }

    /// Every combination, last axis fastest.
    pub fn combinations(&self) -> Vec<ParameterSet> {
        let names: Vec<&String> = self.axes.keys().collect();
        let axes: Vec<&Vec<f64>> = self.axes.values().collect();
        let total = self.size();
        let mut out = Vec::with_capacity(total);
        let mut idx = vec![0usize; axes.len()];

        for _ in 0..total {
            out.push(
                names
                    .iter()
                    .zip(&axes)
                    .zip(&idx)
                    .map(|((name, axis), &i)| ((*name).clone(), axis[i]))
                    .collect(),
            );
            for d in (0..axes.len()).rev() {
                idx[d] += 1;
                if idx[d] < axes[d].len() {
                    break;
                }
                idx[d] = 0;
            }
        }
        out
    }
}
