//! Liquidity prefilter - drops symbols whose recent traded notional is too
//! small to act on.
//!
//! `average_notional` is the mean of `close × volume × lot_size` over the
//! trailing `window` bars (fewer when the series is shorter). A symbol is kept
//! iff that mean is strictly above `min_notional`. The floor is absolute, not
//! relative to the rest of the universe.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{truncate_as_of, Bar, Series};
use crate::indicators::mean;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiquidityFilter {
    /// Trailing bars averaged.
    pub window: usize,
    /// Contract multiplier applied to volume (provider volume in lots of 100 shares).
    pub lot_size: f64,
    /// Notional floor, in the series' currency.
    pub min_notional: f64,
    /// Measure on the as-of view instead of the latest bars.
    pub as_of_aware: bool,
}

impl Default for LiquidityFilter {
    fn default() -> Self {
        Self {
            window: 10,
            lot_size: 100.0,
            min_notional: 300_000_000.0,
            as_of_aware: false,
        }
    }
}

impl LiquidityFilter {
    pub fn with_min_notional(min_notional: f64) -> Self {
        Self {
            min_notional,
            ..Self::default()
        }
    }

    /// Mean notional over the trailing window; NaN for no bars.
    pub fn average_notional(&self, bars: &[Bar]) -> f64 {
        let start = bars.len().saturating_sub(self.window.max(1));
        mean(bars[start..].iter().map(|b| b.notional(self.lot_size)))
    }

    pub fn passes(&self, bars: &[Bar]) -> bool {
        self.average_notional(bars) > self.min_notional
    }

    /// Keep the liquid series, preserving input order.
    pub fn filter<'a>(
        &self,
        series: impl IntoIterator<Item = &'a Series>,
        as_of: Option<NaiveDate>,
    ) -> Vec<&'a Series> {
        series
            .into_iter()
            .filter(|s| {
                let bars = if self.as_of_aware {
                    truncate_as_of(s.bars(), as_of)
                } else {
                    s.bars()
                };
                self.passes(bars)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Symbol;

    fn series(code: &str, closes_volumes: &[(f64, f64)]) -> Series {
        let base = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let bars = closes_volumes
            .iter()
            .enumerate()
            .map(|(i, &(close, volume))| Bar {
                date: base + chrono::Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume,
                pct_change: 0.0,
            })
            .collect();
        Series::new(Symbol::new(code, ""), bars)
    }

    #[test]
    fn averages_only_trailing_window() {
        let filter = LiquidityFilter::default();
        let mut rows = vec![(100.0, 1_000_000.0); 5];
        rows.extend(vec![(10.0, 10_000.0); 10]);
        let s = series("A", &rows);
        // Only the last ten bars count: 10 * 10_000 * 100 = 10M.
        assert!((filter.average_notional(s.bars()) - 10_000_000.0).abs() < 1e-6);
        assert!(!filter.passes(s.bars()));
    }

    #[test]
    fn short_series_uses_available_bars() {
        let filter = LiquidityFilter::default();
        let s = series("A", &[(20.0, 200_000.0), (20.0, 200_000.0)]);
        // 20 * 200_000 * 100 = 400M > 300M
        assert!(filter.passes(s.bars()));
    }

    #[test]
    fn threshold_is_strict() {
        let filter = LiquidityFilter::default();
        let s = series("A", &[(10.0, 300_000.0)]);
        assert_eq!(filter.average_notional(s.bars()), 300_000_000.0);
        assert!(!filter.passes(s.bars()));
    }

    #[test]
    fn empty_series_is_dropped() {
        assert!(!LiquidityFilter::default().passes(&[]));
    }

    #[test]
    fn filter_preserves_order_and_respects_as_of_flag() {
        let liquid = series("L", &[(50.0, 1_000_000.0); 12]);
        let mut rows = vec![(50.0, 1_000_000.0); 10];
        rows.extend(vec![(1.0, 1.0); 10]);
        let faded = series("F", &rows);
        let cut = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();

        let latest = LiquidityFilter::default();
        let kept: Vec<&str> = latest
            .filter([&liquid, &faded], Some(cut))
            .iter()
            .map(|s| s.symbol.code.as_str())
            .collect();
        assert_eq!(kept, vec!["L"]);

        let as_of = LiquidityFilter {
            as_of_aware: true,
            ..LiquidityFilter::default()
        };
        assert_eq!(as_of.filter([&liquid, &faded], Some(cut)).len(), 2);
    }
}
