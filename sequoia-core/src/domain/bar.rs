//! Bar - one trading day for one symbol.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily OHLCV bar after preprocessing.
///
/// `pct_change` is the close-to-close change in percent versus the previous
/// bar of the same series (NaN on the first bar). OHLC consistency is not
/// enforced: bars come from an external source and are taken as given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub pct_change: f64,
}

impl Bar {
    /// Returns true if any price field is NaN (void bar).
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, high >= open, high >= close, etc.
    ///
    /// The preprocessor counts insane bars in its log but keeps them as given.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
            && self.volume >= 0.0
    }

    /// Traded notional for the bar: close × volume × lot size.
    pub fn notional(&self, lot_size: f64) -> f64 {
        self.close * self.volume * lot_size
    }
}
