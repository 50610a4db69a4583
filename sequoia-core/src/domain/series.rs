//! Series - the ordered bar history of one symbol, plus as-of truncation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Bar, Symbol};

/// Ordered daily bars for one symbol, strictly increasing by date.
///
/// Built once by the preprocessor and handed downstream as an immutable value.
/// Non-trading days are simply absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub symbol: Symbol,
    bars: Vec<Bar>,
}

impl Series {
    /// Wrap already-ordered bars. Callers outside the preprocessor are
    /// responsible for the date ordering (tests and fixtures).
    pub fn new(symbol: Symbol, bars: Vec<Bar>) -> Self {
        Self { symbol, bars }
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    /// Borrow the bars visible on `as_of` (all bars when `None`).
    pub fn as_of(&self, as_of: Option<NaiveDate>) -> &[Bar] {
        truncate_as_of(&self.bars, as_of)
    }

    /// Owned copy restricted to bars dated on or before `date`.
    pub fn truncated(&self, date: NaiveDate) -> Series {
        Series {
            symbol: self.symbol.clone(),
            bars: truncate_as_of(&self.bars, Some(date)).to_vec(),
        }
    }
}

/// Prefix of `bars` with `date <= as_of`.
///
/// Relies on ascending dates, so truncation is a binary search and never copies.
/// Truncating twice to the same date yields the same slice.
pub fn truncate_as_of(bars: &[Bar], as_of: Option<NaiveDate>) -> &[Bar] {
    match as_of {
        None => bars,
        Some(date) => {
            let end = bars.partition_point(|b| b.date <= date);
            &bars[..end]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(n: usize) -> Series {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = (0..n)
            .map(|i| Bar {
                date: base + chrono::Duration::days(i as i64),
                open: 10.0,
                high: 11.0,
                low: 9.0,
                close: 10.0,
                volume: 1000.0,
                pct_change: 0.0,
            })
            .collect();
        Series::new(Symbol::new("000001", "Test"), bars)
    }

    #[test]
    fn as_of_none_returns_everything() {
        let s = series(10);
        assert_eq!(s.as_of(None).len(), 10);
    }

    #[test]
    fn as_of_cuts_after_date() {
        let s = series(10);
        let cut = NaiveDate::from_ymd_opt(2024, 1, 4).unwrap();
        let view = s.as_of(Some(cut));
        assert_eq!(view.len(), 4);
        assert_eq!(view.last().unwrap().date, cut);
    }

    #[test]
    fn as_of_before_listing_is_empty() {
        let s = series(5);
        let cut = NaiveDate::from_ymd_opt(2023, 12, 1).unwrap();
        assert!(s.as_of(Some(cut)).is_empty());
    }

    #[test]
    fn truncated_is_idempotent() {
        let s = series(30);
        let cut = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let once = s.truncated(cut);
        let twice = once.truncated(cut);
        assert_eq!(once, twice);
        assert_eq!(once.last_date(), Some(cut));
    }
}
