//! Sequoia Core - bar data, fetching, liquidity screening and Wyckoff detectors.
//!
//! This crate holds everything that does not need a run configuration:
//! - Domain types (symbols, bars, series with as-of truncation)
//! - Data providers, universe files and the concurrent fetch orchestrator
//! - Rolling indicators used by the detectors
//! - The liquidity pre-filter
//! - The `Detector` contract and the four Wyckoff detectors

pub mod data;
pub mod detect;
pub mod domain;
pub mod indicators;
pub mod liquidity;

pub use detect::{Detection, Detector, RunContext};
pub use domain::{Bar, Series, Symbol};
pub use liquidity::LiquidityFilter;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything shared with the fetch and detector
    /// pools is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::Series>();
        require_sync::<domain::Series>();
        require_send::<domain::Symbol>();
        require_sync::<domain::Symbol>();

        require_send::<data::FetchSummary>();
        require_sync::<data::FetchSummary>();
        require_send::<data::CircuitBreaker>();
        require_sync::<data::CircuitBreaker>();
        require_send::<data::YahooProvider>();
        require_sync::<data::YahooProvider>();
        require_send::<data::CsvDirProvider>();
        require_sync::<data::CsvDirProvider>();

        require_send::<detect::RunContext>();
        require_sync::<detect::RunContext>();
        require_send::<detect::Detection>();
        require_sync::<detect::Detection>();
        require_send::<Box<dyn detect::Detector>>();
        require_sync::<Box<dyn detect::Detector>>();
        require_send::<LiquidityFilter>();
        require_sync::<LiquidityFilter>();
    }

    /// Detectors see bars and a run context only; no provider, no notifier.
    #[test]
    fn detector_trait_is_a_pure_predicate() {
        fn _check_trait_object_builds(
            det: &dyn detect::Detector,
            symbol: &domain::Symbol,
            bars: &[domain::Bar],
            ctx: &detect::RunContext,
        ) -> detect::Detection {
            det.detect(symbol, bars, ctx)
        }
    }
}
