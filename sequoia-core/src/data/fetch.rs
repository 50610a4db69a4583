//! Concurrent fetch orchestrator - pulls the whole universe once per run.
//!
//! A private rayon pool of `workers` threads takes one symbol per job. Each
//! job runs the provider inside an error boundary (`Result` plus
//! `catch_unwind`), so a failing or panicking fetch only drops that symbol.
//! A failed fetch makes its worker sleep for `failure_backoff` before taking
//! the next job; the symbol itself is never retried within the run.
//!
//! Results land in a mutex-guarded collector in completion order and are
//! re-ordered into universe order at the end, so downstream reports are
//! reproducible.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::NaiveDate;
use indexmap::IndexMap;
use rayon::prelude::*;
use tracing::{debug, error, info};

use super::ingest::preprocess;
use super::provider::{DataError, DataProvider};
use crate::domain::{Series, Symbol};

/// Default fetch parallelism.
pub const DEFAULT_WORKERS: usize = 8;

/// Options for one orchestrated fetch.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub workers: usize,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub failure_backoff: Duration,
}

impl FetchOptions {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            start,
            end,
            failure_backoff: Duration::from_millis(500),
        }
    }
}

/// What happened to one symbol.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Fetched { bars: usize },
    Empty,
    Failed(String),
}

/// Side-channel progress reporting; `completed` increases by one per call.
pub trait FetchProgress: Send + Sync {
    fn on_complete(&self, symbol: &Symbol, completed: usize, total: usize, outcome: &FetchOutcome);

    fn on_batch_complete(&self, _summary: &FetchSummary) {}
}

/// Progress reporter that writes to the tracing log.
///
/// Every completion is a `debug!` line; one `info!` line per `every` symbols
/// keeps a several-thousand-symbol run readable.
#[derive(Debug, Clone)]
pub struct LogProgress {
    pub every: usize,
}

impl Default for LogProgress {
    fn default() -> Self {
        Self { every: 100 }
    }
}

impl FetchProgress for LogProgress {
    fn on_complete(&self, symbol: &Symbol, completed: usize, total: usize, outcome: &FetchOutcome) {
        debug!(symbol = %symbol, ?outcome, "fetch progress: {completed}/{total}");
        if completed == total || completed % self.every.max(1) == 0 {
            info!("fetch progress: {completed}/{total}");
        }
    }

    fn on_batch_complete(&self, summary: &FetchSummary) {
        info!(
            empty = summary.empty,
            failed = summary.failures.len(),
            "fetched {}/{} symbols",
            summary.fetched(),
            summary.total
        );
    }
}

/// Reporter that ignores progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl FetchProgress for NoProgress {
    fn on_complete(&self, _: &Symbol, _: usize, _: usize, _: &FetchOutcome) {}
}

/// Result of fetching a universe.
#[derive(Debug, Default)]
pub struct FetchSummary {
    /// Universe size.
    pub total: usize,
    /// Successful, non-empty series in universe order.
    pub series: IndexMap<Symbol, Series>,
    /// Symbols with no data.
    pub empty: usize,
    /// Symbols whose fetch failed, in universe order.
    pub failures: Vec<(Symbol, DataError)>,
}

impl FetchSummary {
    pub fn fetched(&self) -> usize {
        self.series.len()
    }
}

#[derive(Default)]
struct Collector {
    series: Vec<(usize, Series)>,
    empty: usize,
    failures: Vec<(usize, Symbol, DataError)>,
}

/// Fetch every symbol of `universe` with bounded parallelism.
///
/// Only fails if the worker pool itself cannot be built; per-symbol failures
/// are recorded in the summary.
pub fn fetch_universe(
    provider: &dyn DataProvider,
    universe: &[Symbol],
    opts: &FetchOptions,
    progress: &dyn FetchProgress,
) -> Result<FetchSummary, DataError> {
    let total = universe.len();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.workers.max(1))
        .thread_name(|i| format!("sequoia-fetch-{i}"))
        .build()
        .map_err(|e| DataError::Other(format!("failed to build fetch pool: {e}")))?;

    let collector = Mutex::new(Collector::default());
    let completed = AtomicUsize::new(0);

    pool.install(|| {
        universe
            .par_iter()
            .enumerate()
            .with_max_len(1)
            .for_each(|(index, symbol)| {
                let result = fetch_one(provider, symbol, opts);

                let outcome = match &result {
                    Ok(Some(series)) => FetchOutcome::Fetched {
                        bars: series.len(),
                    },
                    Ok(None) => FetchOutcome::Empty,
                    Err(e) => FetchOutcome::Failed(e.to_string()),
                };

                let failed = {
                    let mut c = collector
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                    match result {
                        Ok(Some(series)) => {
                            c.series.push((index, series));
                            false
                        }
                        Ok(None) => {
                            c.empty += 1;
                            false
                        }
                        Err(e) => {
                            error!(symbol = %symbol, "fetch failed: {e}");
                            c.failures.push((index, symbol.clone(), e));
                            true
                        }
                    }
                };

                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                progress.on_complete(symbol, done, total, &outcome);

                if failed && !opts.failure_backoff.is_zero() {
                    std::thread::sleep(opts.failure_backoff);
                }
            });
    });

    let mut c = collector
        .into_inner()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    c.series.sort_by_key(|(i, _)| *i);
    c.failures.sort_by_key(|(i, _, _)| *i);

    let summary = FetchSummary {
        total,
        series: c
            .series
            .into_iter()
            .map(|(_, s)| (s.symbol.clone(), s))
            .collect(),
        empty: c.empty,
        failures: c.failures.into_iter().map(|(_, s, e)| (s, e)).collect(),
    };
    progress.on_batch_complete(&summary);
    Ok(summary)
}

/// One symbol: provider call → preprocess. `Ok(None)` means no data.
fn fetch_one(
    provider: &dyn DataProvider,
    symbol: &Symbol,
    opts: &FetchOptions,
) -> Result<Option<Series>, DataError> {
    let fetched = catch_unwind(AssertUnwindSafe(|| {
        provider.fetch(symbol, opts.start, opts.end)
    }))
    .map_err(|payload| DataError::Other(format!("fetch panicked: {}", panic_message(&*payload))))?;

    match fetched {
        Ok(raw) => {
            let series = preprocess(symbol.clone(), raw);
            if series.is_none() {
                debug!(symbol = %symbol, "no bars, skipping");
            }
            Ok(series)
        }
        Err(e) if e.is_missing_data() => {
            debug!(symbol = %symbol, "no data, skipping: {e}");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".into()
    }
}
