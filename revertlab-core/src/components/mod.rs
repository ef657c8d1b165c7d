//! Strategy components.
//!
//! A strategy is assembled from three independent pieces over shared
//! precomputed indicators:
//! - Pattern detector: classifies each bar against its predecessor
//! - Signal filter: admits pattern flags as directional entry signals
//! - Stop policy: places and trails the protective stop
//!
//! `composition` wires a concrete filter and stop from `StrategyParams`.

pub mod composition;
pub mod filter;
pub mod indicator;
pub mod pattern;
pub mod stop;

pub use composition::{
    build_composition, CompositionError, FilterKind, StopKind, StrategyComposition, StrategyParams,
};
pub use filter::{Signal, SignalFilter};
pub use indicator::{precompute_indicators, Indicator, IndicatorValues};
pub use pattern::{detect, detect_series, Band, PatternError, PatternFlags};
pub use stop::{StopError, StopPolicy};
