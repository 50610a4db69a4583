//! Pattern detectors - pure predicates over a bar series.
//!
//! Every detector sees bars through a [`RunContext`]: with an as-of date the
//! series is cut to bars dated on or before it, which is the only difference
//! between live screening and backtesting. Detectors never mutate their input;
//! rolling columns are computed into private vectors.

pub mod accumulation;
pub mod divergence;
pub mod registry;
pub mod selling_climax;
pub mod spring;

pub use accumulation::{AccumulationDetector, AccumulationParams};
pub use divergence::{DivergenceDetector, DivergenceParams, VolumeNoRiseDetector};
pub use registry::{build_detector, build_detectors, DetectorKind, DetectorParams, ParamError};
pub use selling_climax::{SellingClimaxDetector, SellingClimaxParams};
pub use spring::{SpringDetector, SpringParams};

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{truncate_as_of, Bar, Series, Symbol};

/// Per-run parameters threaded unchanged through every detector call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunContext {
    pub as_of: Option<NaiveDate>,
}

impl RunContext {
    /// Screen on the latest data.
    pub fn live() -> Self {
        Self { as_of: None }
    }

    /// Screen as of a historical date (backtesting).
    pub fn as_of(date: NaiveDate) -> Self {
        Self { as_of: Some(date) }
    }

    /// The bars a detector may look at.
    pub fn view<'a>(&self, bars: &'a [Bar]) -> &'a [Bar] {
        truncate_as_of(bars, self.as_of)
    }

    /// False when the symbol had not listed yet on the as-of date.
    pub fn is_listed(&self, series: &Series) -> bool {
        match (self.as_of, series.first_date()) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(as_of), Some(first)) => first <= as_of,
        }
    }
}

/// Outcome of one detector on one symbol.
///
/// Only `matched` drives the pipeline; the rest is for reports and audit logs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub matched: bool,
    /// Date of the bar that anchors the pattern (breakout, climax, confirm).
    pub event_date: Option<NaiveDate>,
    pub diagnostic: Option<String>,
    /// Computed ratios and bounds behind the diagnostic.
    pub metadata: BTreeMap<String, f64>,
}

impl Detection {
    pub fn no_match() -> Self {
        Self::default()
    }

    pub fn matched(event_date: NaiveDate, diagnostic: String) -> Self {
        Self {
            matched: true,
            event_date: Some(event_date),
            diagnostic: Some(diagnostic),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: f64) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    pub fn is_match(&self) -> bool {
        self.matched
    }
}

/// A pattern detector.
///
/// Implementations hold their thresholds (built once from configuration) and
/// must be deterministic: no wall clock, no shared mutable state. Fewer bars
/// than `min_bars()` after as-of truncation is a non-match, never an error.
pub trait Detector: Send + Sync {
    /// Stable key, e.g. "accumulation".
    fn name(&self) -> &str;

    /// Display label used when reporting matches.
    fn label(&self) -> &str;

    /// Minimum bars required after as-of truncation.
    fn min_bars(&self) -> usize;

    fn detect(&self, symbol: &Symbol, bars: &[Bar], ctx: &RunContext) -> Detection;
}

/// As-of view of `bars`, or `None` when the sample is too short.
pub(crate) fn sample<'a>(
    detector: &dyn Detector,
    symbol: &Symbol,
    bars: &'a [Bar],
    ctx: &RunContext,
) -> Option<&'a [Bar]> {
    let view = ctx.view(bars);
    if view.len() < detector.min_bars() {
        debug!(
            detector = detector.name(),
            symbol = %symbol,
            "sample shorter than {} bars ({})",
            detector.min_bars(),
            view.len()
        );
        return None;
    }
    Some(view)
}

/// Bars from `(open, high, low, close, volume)` rows on consecutive days
/// starting 2024-01-01, with `pct_change` derived from the closes.
#[cfg(test)]
pub(crate) fn ohlcv(rows: &[(f64, f64, f64, f64, f64)]) -> Vec<Bar> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let mut prev_close = f64::NAN;
    rows.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close, volume))| {
            let pct_change = (close / prev_close - 1.0) * 100.0;
            prev_close = close;
            Bar {
                date: start + chrono::Duration::days(i as i64),
                open,
                high,
                low,
                close,
                volume,
                pct_change,
            }
        })
        .collect()
}
