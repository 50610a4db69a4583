//! Screening pipeline: universe → fetch → liquidity → detectors → notifier.
//!
//! One `run` is one screening pass. Per-symbol failures and notifier failures
//! are logged and never abort the run; only a missing universe does.

use std::panic::{catch_unwind, AssertUnwindSafe};

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use sequoia_core::data::{
    fetch_universe, DataError, DataProvider, FetchOptions, FetchProgress, FetchSummary,
    UniverseProvider,
};
use sequoia_core::detect::build_detectors;
use sequoia_core::{Detection, Detector, RunContext, Series, Symbol};

use crate::breadth::MarketBreadth;
use crate::config::ScreenConfig;
use crate::notify::{format_batch, Notifier};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("universe is empty, nothing to screen")]
    EmptyUniverse,

    #[error("universe unavailable: {0}")]
    Universe(#[source] DataError),

    #[error("fetch orchestration failed: {0}")]
    Fetch(#[source] DataError),
}

/// One symbol a detector matched.
#[derive(Debug, Clone, Serialize)]
pub struct SymbolMatch {
    pub symbol: Symbol,
    pub detection: Detection,
}

/// Outcome of one detector over the liquid candidates.
#[derive(Debug, Clone, Serialize)]
pub struct DetectorReport {
    pub name: String,
    pub label: String,
    /// Liquid symbols listed as of the run date.
    pub candidates: usize,
    /// Matches in candidate order.
    pub matches: Vec<SymbolMatch>,
}

impl DetectorReport {
    pub fn symbols(&self) -> Vec<Symbol> {
        self.matches.iter().map(|m| m.symbol.clone()).collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub as_of: Option<NaiveDate>,
    pub universe_size: usize,
    pub fetched: usize,
    pub failed: usize,
    pub empty: usize,
    pub liquid: usize,
    pub breadth: MarketBreadth,
    pub results: Vec<DetectorReport>,
}

impl RunReport {
    /// Matches of the detector named `name`, empty if it did not run.
    pub fn matches_of(&self, name: &str) -> Vec<Symbol> {
        self.results
            .iter()
            .find(|r| r.name == name)
            .map(DetectorReport::symbols)
            .unwrap_or_default()
    }
}

pub struct ScreeningPipeline<'a> {
    config: &'a ScreenConfig,
    detectors: Vec<Box<dyn Detector>>,
    notifier: Box<dyn Notifier>,
    today: NaiveDate,
}

impl<'a> ScreeningPipeline<'a> {
    /// Pipeline running the configured detectors, in configured order.
    pub fn new(config: &'a ScreenConfig, notifier: Box<dyn Notifier>) -> Self {
        Self {
            config,
            detectors: build_detectors(&config.detectors, &config.detector_params()),
            notifier,
            today: chrono::Local::now().date_naive(),
        }
    }

    /// Append a detector after the configured ones.
    pub fn with_detector(mut self, detector: Box<dyn Detector>) -> Self {
        self.detectors.push(detector);
        self
    }

    /// End of the fetch window when no as-of date is configured.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn run(
        &self,
        universe: &dyn UniverseProvider,
        provider: &dyn DataProvider,
        progress: &dyn FetchProgress,
    ) -> Result<RunReport, PipelineError> {
        let symbols = universe.symbols().map_err(PipelineError::Universe)?;
        if symbols.is_empty() {
            return Err(PipelineError::EmptyUniverse);
        }

        if !provider.is_available() {
            warn!("{} is refusing requests, fetches will fail fast", provider.name());
        }

        let end = self.config.as_of_date.unwrap_or(self.today);
        let mut opts = FetchOptions::new(self.config.history_start, end);
        opts.workers = self.config.worker_count;
        opts.failure_backoff = self.config.failure_backoff();
        info!(
            universe = symbols.len(),
            workers = opts.workers,
            "fetching {} .. {end} from {}",
            opts.start,
            provider.name()
        );

        let summary =
            fetch_universe(provider, &symbols, &opts, progress).map_err(PipelineError::Fetch)?;
        Ok(self.screen(&summary))
    }

    /// Everything after the fetch: breadth, liquidity, detectors, notifications.
    pub fn screen(&self, summary: &FetchSummary) -> RunReport {
        let as_of = self.config.as_of_date;
        let ctx = RunContext { as_of };

        let fetched = format!("fetched {}/{} symbols", summary.fetched(), summary.total);
        info!(empty = summary.empty, failed = summary.failures.len(), "{fetched}");
        self.send(&fetched);

        let breadth = MarketBreadth::compute(summary.series.values(), as_of);
        self.send(&breadth.to_string());

        let liquid = self.config.liquidity.filter(summary.series.values(), as_of);
        let liquid_line = format!("liquid {}/{} symbols", liquid.len(), summary.fetched());
        info!("{liquid_line}");
        self.send(&liquid_line);

        let candidates: Vec<&Series> = liquid
            .iter()
            .copied()
            .filter(|s| {
                let listed = ctx.is_listed(s);
                if !listed {
                    debug!(symbol = %s.symbol, "not listed as of {as_of:?}, skipping");
                }
                listed
            })
            .collect();

        let mut results = Vec::with_capacity(self.detectors.len());
        for (i, detector) in self.detectors.iter().enumerate() {
            let report = run_detector(detector.as_ref(), &candidates, &ctx);
            info!(
                detector = detector.name(),
                "{} matched {}/{}",
                detector.label(),
                report.matches.len(),
                report.candidates
            );
            if !report.matches.is_empty() {
                self.send(&format_batch(detector.label(), &report.symbols()));
            }
            results.push(report);

            let pause = self.config.detector_pause();
            if i + 1 < self.detectors.len() && !pause.is_zero() {
                std::thread::sleep(pause);
            }
        }

        RunReport {
            as_of,
            universe_size: summary.total,
            fetched: summary.fetched(),
            failed: summary.failures.len(),
            empty: summary.empty,
            liquid: liquid.len(),
            breadth,
            results,
        }
    }

    fn send(&self, message: &str) {
        if let Err(e) = self.notifier.notify(message) {
            warn!("notification failed: {e}");
        }
    }
}

/// Apply one detector to every candidate; order of the output follows the
/// candidates. A panicking detector counts as a non-match for that symbol.
fn run_detector(detector: &dyn Detector, candidates: &[&Series], ctx: &RunContext) -> DetectorReport {
    let detections: Vec<Option<Detection>> = candidates
        .par_iter()
        .map(|s| {
            let result = catch_unwind(AssertUnwindSafe(|| detector.detect(&s.symbol, s.bars(), ctx)));
            match result {
                Ok(d) => d.matched.then_some(d),
                Err(_) => {
                    error!(detector = detector.name(), symbol = %s.symbol, "detector panicked");
                    None
                }
            }
        })
        .collect();

    let matches = candidates
        .iter()
        .zip(detections)
        .filter_map(|(s, d)| {
            d.map(|detection| SymbolMatch {
                symbol: s.symbol.clone(),
                detection,
            })
        })
        .collect();

    DetectorReport {
        name: detector.name().to_string(),
        label: detector.label().to_string(),
        candidates: candidates.len(),
        matches,
    }
}
