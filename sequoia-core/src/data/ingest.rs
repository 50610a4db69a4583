//! Preprocessor: raw provider bars → immutable `Series`.
//!
//! Sorts by date, drops duplicate dates (the later row wins) and attaches the
//! per-bar `pct_change` column. Prices are not corrected; bars failing the
//! OHLC sanity check are only counted in the debug log.

use tracing::debug;

use super::provider::RawBar;
use crate::domain::{Bar, Series, Symbol};
use crate::indicators::{Indicator, Roc};

/// Build a series from raw bars. Returns `None` when there is nothing to keep.
pub fn preprocess(symbol: Symbol, mut raw: Vec<RawBar>) -> Option<Series> {
    if raw.is_empty() {
        return None;
    }

    raw.sort_by_key(|b| b.date);
    // dedup_by keeps the first of a run; reverse so the later row survives.
    raw.reverse();
    raw.dedup_by_key(|b| b.date);
    raw.reverse();

    let mut bars: Vec<Bar> = raw
        .into_iter()
        .map(|r| Bar {
            date: r.date,
            open: r.open,
            high: r.high,
            low: r.low,
            close: r.close,
            volume: r.volume,
            pct_change: f64::NAN,
        })
        .collect();

    let insane = bars.iter().filter(|b| !b.is_sane()).count();
    if insane > 0 {
        debug!(symbol = %symbol, insane, bars = bars.len(), "kept bars failing the OHLC check");
    }

    let pct = Roc::new(1).compute(&bars);
    for (bar, p) in bars.iter_mut().zip(pct) {
        bar.pct_change = p;
    }

    Some(Series::new(symbol, bars))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn raw(day: u32, close: f64) -> RawBar {
        RawBar {
            date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 10.0,
        }
    }

    #[test]
    fn empty_input_yields_none() {
        assert!(preprocess(Symbol::new("X", ""), Vec::new()).is_none());
    }

    #[test]
    fn sorts_and_computes_pct_change() {
        let series = preprocess(
            Symbol::new("X", ""),
            vec![raw(3, 11.0), raw(2, 10.0), raw(6, 9.9)],
        )
        .unwrap();
        let bars = series.bars();
        assert_eq!(bars.len(), 3);
        assert!(bars[0].pct_change.is_nan());
        assert!((bars[1].pct_change - 10.0).abs() < 1e-9);
        assert!((bars[2].pct_change + 10.0).abs() < 1e-9);
    }

    #[test]
    fn duplicate_dates_keep_last_row() {
        let series = preprocess(
            Symbol::new("X", ""),
            vec![raw(2, 10.0), raw(3, 11.0), raw(3, 12.0)],
        )
        .unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.bars()[1].close, 12.0);
    }

    #[test]
    fn insane_bars_pass_through_unchanged() {
        let mut broken = raw(3, 11.0);
        broken.high = 9.0;
        broken.low = 12.0;
        let series = preprocess(Symbol::new("X", ""), vec![raw(2, 10.0), broken]).unwrap();

        let bar = &series.bars()[1];
        assert!(!bar.is_sane());
        assert_eq!((bar.high, bar.low, bar.close), (9.0, 12.0, 11.0));
        assert!((bar.pct_change - 10.0).abs() < 1e-9);
    }
}
