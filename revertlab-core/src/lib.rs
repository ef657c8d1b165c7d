//! RevertLab Core — price series, indicators, candle patterns, signal filters,
//! stop policies, and the bar-by-bar trade lifecycle engine.
//!
//! Pipeline for one parameter set:
//! - `indicators`: pure series transforms precomputed into `IndicatorValues`
//! - `components::pattern`: two-bar reversal classification per bar
//! - `components::filter`: admission rule turning pattern flags into signals
//! - `components::stop`: initial and trailing stop levels
//! - `engine`: sequential state machine producing the position timeline
//!
//! Everything here is deterministic and free of shared mutable state, so a
//! parameter grid can evaluate many compositions over the same bars in parallel.

pub mod components;
pub mod domain;
pub mod engine;
pub mod indicators;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything a grid worker touches is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::PriceSeries>();
        require_sync::<domain::PriceSeries>();
        require_send::<domain::TradeState>();
        require_sync::<domain::TradeState>();

        require_send::<components::IndicatorValues>();
        require_sync::<components::IndicatorValues>();
        require_send::<components::PatternFlags>();
        require_sync::<components::PatternFlags>();
        require_send::<components::Signal>();
        require_sync::<components::Signal>();
        require_send::<components::StrategyParams>();
        require_sync::<components::StrategyParams>();
        require_send::<components::StrategyComposition>();
        require_sync::<components::StrategyComposition>();

        require_send::<components::filter::MomentumFilter>();
        require_sync::<components::filter::MomentumFilter>();
        require_send::<components::filter::EnvelopeFilter>();
        require_sync::<components::filter::EnvelopeFilter>();
        require_send::<components::stop::AtrTrailingStop>();
        require_sync::<components::stop::AtrTrailingStop>();
        require_send::<components::stop::FixedStop>();
        require_sync::<components::stop::FixedStop>();

        require_send::<engine::Timeline>();
        require_sync::<engine::Timeline>();
        require_send::<engine::StrategyRun>();
        require_sync::<engine::StrategyRun>();
    }

    /// Architecture contract: stop policies see bars and indicators, never signals.
    ///
    /// A stop that could read the signal series could react to information the
    /// lifecycle engine has not released yet.
    #[test]
    fn stop_policy_trait_has_no_signal_parameter() {
        fn _check_trait_object_builds(
            stop: &dyn components::StopPolicy,
            bars: &[domain::Bar],
            indicators: &components::IndicatorValues,
        ) -> f64 {
            stop.on_bar(domain::Direction::Long, bars, 0, 100.0, indicators)
        }
    }
}
