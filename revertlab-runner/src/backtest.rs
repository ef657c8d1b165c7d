//! Backtest collaborator contract.
//!
//! The lifecycle engine decides *when* to be in the market; a collaborator
//! turns those decisions into P&L and statistics. The contract is a plain
//! trait so the reference `SignalPortfolio` can be swapped for another
//! implementation or a test double.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum BacktestError {
    #[error("signal input length mismatch: {0}")]
    LengthMismatch(String),

    #[error("need at least 2 bars, got {0}")]
    TooShort(usize),

    #[error("non-finite execution price {price} at bar {bar_index}")]
    NonFinitePrice { bar_index: usize, price: f64 },

    #[error("invalid portfolio settings: {0}")]
    InvalidSettings(String),
}

// ─── Bar frequency ──────────────────────────────────────────────────

/// Bar spacing used to annualise statistics, written as `<n><unit>` with
/// unit one of `s`, `m`, `h`, `d`, `w` (e.g. "30m", "1h", "1d").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BarFrequency {
    seconds: u64,
}

const SECONDS_PER_YEAR: f64 = 365.0 * 86_400.0;

impl BarFrequency {
    pub fn from_seconds(seconds: u64) -> Result<Self, String> {
        if seconds == 0 {
            return Err("bar frequency must be positive".into());
        }
        Ok(Self { seconds })
    }

    pub fn seconds(&self) -> u64 {
        self.seconds
    }

    pub fn duration(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.seconds as i64)
    }

    /// Bars per 365-day year.
    pub fn periods_per_year(&self) -> f64 {
        SECONDS_PER_YEAR / self.seconds as f64
    }
}

impl Default for BarFrequency {
    fn default() -> Self {
        Self { seconds: 30 * 60 }
    }
}

impl FromStr for BarFrequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| format!("bar frequency '{s}' has no unit"))?;
        let (count, unit) = s.split_at(split);
        let count: u64 = count
            .parse()
            .map_err(|_| format!("bar frequency '{s}' has no count"))?;
        let unit_secs = match unit {
            "s" => 1,
            "m" | "min" | "T" => 60,
            "h" | "H" => 3_600,
            "d" | "D" => 86_400,
            "w" | "W" => 7 * 86_400,
            other => return Err(format!("unknown bar frequency unit '{other}'")),
        };
        Self::from_seconds(count * unit_secs)
    }
}

impl TryFrom<String> for BarFrequency {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BarFrequency> for String {
    fn from(f: BarFrequency) -> Self {
        f.to_string()
    }
}

impl fmt::Display for BarFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.seconds;
        if s % (7 * 86_400) == 0 {
            write!(f, "{}w", s / (7 * 86_400))
        } else if s % 86_400 == 0 {
            write!(f, "{}d", s / 86_400)
        } else if s % 3_600 == 0 {
            write!(f, "{}h", s / 3_600)
        } else if s % 60 == 0 {
            write!(f, "{}m", s / 60)
        } else {
            write!(f, "{s}s")
        }
    }
}

// ─── Contract ───────────────────────────────────────────────────────

/// Fee, capital, and frequency shared by every run of one optimisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortfolioSettings {
    /// Flat fee rate charged on each fill's notional.
    pub fees: f64,
    pub init_cash: f64,
    pub freq: BarFrequency,
}

impl Default for PortfolioSettings {
    fn default() -> Self {
        Self {
            fees: 0.0005,
            init_cash: 100_000.0,
            freq: BarFrequency::default(),
        }
    }
}

impl PortfolioSettings {
    pub fn validate(&self) -> Result<(), BacktestError> {
        if !(self.fees.is_finite() && self.fees >= 0.0 && self.fees < 1.0) {
            return Err(BacktestError::InvalidSettings(format!(
                "fees {} outside [0, 1)",
                self.fees
            )));
        }
        if !(self.init_cash.is_finite() && self.init_cash > 0.0) {
            return Err(BacktestError::InvalidSettings(format!(
                "init_cash {} must be positive",
                self.init_cash
            )));
        }
        Ok(())
    }
}

/// Everything the collaborator consumes, index-aligned.
#[derive(Debug, Clone, Copy)]
pub struct SignalInput<'a> {
    pub timestamps: &'a [NaiveDateTime],
    pub prices: &'a [f64],
    pub long_entries: &'a [bool],
    pub short_entries: &'a [bool],
    pub long_exits: &'a [bool],
    pub short_exits: &'a [bool],
}

impl SignalInput<'_> {
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn validate(&self) -> Result<(), BacktestError> {
        let n = self.prices.len();
        let lens = [
            ("timestamps", self.timestamps.len()),
            ("long_entries", self.long_entries.len()),
            ("short_entries", self.short_entries.len()),
            ("long_exits", self.long_exits.len()),
            ("short_exits", self.short_exits.len()),
        ];
        for (name, len) in lens {
            if len != n {
                return Err(BacktestError::LengthMismatch(format!(
                    "{name} has {len} values, prices has {n}"
                )));
            }
        }
        if n < 2 {
            return Err(BacktestError::TooShort(n));
        }
        Ok(())
    }
}

/// Statistics returned by a collaborator. Percentages are in percent units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioStats {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub total_return_pct: f64,
    pub benchmark_return_pct: f64,
    /// Positive magnitude of the deepest peak-to-trough equity decline.
    pub max_drawdown_pct: f64,
    /// `None` when no trade closed.
    pub win_rate_pct: Option<f64>,
    pub sharpe: f64,
    pub sortino: f64,
    pub calmar: f64,
    /// Closed trades plus a position still open at the end.
    pub total_trades: usize,
    pub closed_trades: usize,
}

/// Converts entry/exit signals into portfolio statistics.
pub trait BacktestEngine: Send + Sync {
    fn name(&self) -> &str;

    fn run(
        &self,
        input: &SignalInput<'_>,
        settings: &PortfolioSettings,
    ) -> Result<PortfolioStats, BacktestError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_frequencies() {
        assert_eq!("30m".parse::<BarFrequency>().unwrap().seconds(), 1_800);
        assert_eq!("1h".parse::<BarFrequency>().unwrap().seconds(), 3_600);
        assert_eq!("1d".parse::<BarFrequency>().unwrap().seconds(), 86_400);
        assert_eq!("15min".parse::<BarFrequency>().unwrap().seconds(), 900);
    }

    #[test]
    fn rejects_bad_frequencies() {
        assert!("m".parse::<BarFrequency>().is_err());
        assert!("30".parse::<BarFrequency>().is_err());
        assert!("0m".parse::<BarFrequency>().is_err());
        assert!("3y".parse::<BarFrequency>().is_err());
    }

    #[test]
    fn periods_per_year_uses_365_days() {
        let daily: BarFrequency = "1d".parse().unwrap();
        assert!((daily.periods_per_year() - 365.0).abs() < 1e-9);
        let half_hour: BarFrequency = "30m".parse().unwrap();
        assert!((half_hour.periods_per_year() - 17_520.0).abs() < 1e-9);
    }

    #[test]
    fn frequency_round_trips_through_string() {
        let f: BarFrequency = serde_json::from_str("\"4h\"").unwrap();
        assert_eq!(serde_json::to_string(&f).unwrap(), "\"4h\"");
        assert_eq!("90m".parse::<BarFrequency>().unwrap().to_string(), "90m");
    }
}
