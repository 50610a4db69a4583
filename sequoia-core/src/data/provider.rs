//! Fetch-client trait, raw bar type and structured data errors.
//!
//! The `DataProvider` trait abstracts over bar sources (Yahoo Finance, a
//! directory of CSV files, in-memory mocks in tests) so the orchestrator never
//! knows where the bars come from.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Symbol;

/// Raw daily OHLCV bar from a provider (before preprocessing).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {code}")]
    SymbolNotFound { code: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("csv error in {path}: {reason}")]
    Csv { path: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("data error: {0}")]
    Other(String),
}

impl DataError {
    /// Missing data is not a failure: the symbol is skipped without backoff.
    pub fn is_missing_data(&self) -> bool {
        matches!(self, Self::SymbolNotFound { .. })
    }
}

/// Trait for fetch clients.
///
/// `fetch` returns the symbol's daily bars between `start` and `end`
/// (inclusive). An empty vector or `DataError::SymbolNotFound` means "no
/// data"; every other error is a transient acquisition failure. The caller
/// never retries a symbol within a run, so implementations that want retries
/// keep them internal.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily OHLCV bars for a symbol over a date range.
    fn fetch(&self, symbol: &Symbol, start: NaiveDate, end: NaiveDate)
        -> Result<Vec<RawBar>, DataError>;

    /// Check if the provider is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool {
        true
    }
}

/// Supplies the ordered symbol list for a run.
pub trait UniverseProvider: Send + Sync {
    fn symbols(&self) -> Result<Vec<Symbol>, DataError>;
}

impl UniverseProvider for Vec<Symbol> {
    fn symbols(&self) -> Result<Vec<Symbol>, DataError> {
        Ok(self.clone())
    }
}
