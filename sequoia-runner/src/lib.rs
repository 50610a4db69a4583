//! Sequoia Runner - screening runs on top of `sequoia-core`.
//!
//! This crate provides:
//! - The TOML run configuration and its validation
//! - The screening pipeline (fetch, liquidity, detector batches)
//! - Market breadth statistics
//! - Notification sinks (log, WxPusher)
//! - The daily trigger schedule

pub mod breadth;
pub mod config;
pub mod notify;
pub mod pipeline;
pub mod schedule;

pub use breadth::MarketBreadth;
pub use config::{ConfigError, PushConfig, ScheduleConfig, ScreenConfig};
pub use notify::{format_batch, LogNotifier, Notifier, NotifyError, WxPusherNotifier};
pub use pipeline::{DetectorReport, PipelineError, RunReport, ScreeningPipeline, SymbolMatch};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<ScreenConfig>();
        assert_sync::<ScreenConfig>();
    }

    #[test]
    fn report_types_are_send_sync() {
        assert_send::<RunReport>();
        assert_sync::<RunReport>();
        assert_send::<MarketBreadth>();
        assert_sync::<MarketBreadth>();
    }

    #[test]
    fn notifiers_are_send_sync() {
        assert_send::<WxPusherNotifier>();
        assert_sync::<WxPusherNotifier>();
        assert_send::<Box<dyn Notifier>>();
        assert_sync::<Box<dyn Notifier>>();
    }
}
