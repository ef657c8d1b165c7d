//! Domain types: bars, the validated price series, and per-bar trade state.

pub mod bar;
pub mod series;
pub mod trade;

pub use bar::Bar;
pub use series::{PriceSeries, SeriesError};
pub use trade::{Direction, TradeState};
