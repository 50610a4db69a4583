//! Spring - a shallow, quiet break below a trading range that is bought back
//! at once and confirmed on volume.
//!
//! By default the range is measured over the bars just before the search
//! window, so the break itself never widens the box it is breaking. With
//! `box_includes_search` the box is the trailing `box_bars` bars instead.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{sample, Detection, Detector, RunContext};
use crate::domain::{Bar, Symbol};
use crate::indicators::{max_high, min_low, Indicator, Sma};

/// Thresholds for [`SpringDetector`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpringParams {
    /// Minimum sample, and the trailing bars the detector looks at.
    pub threshold: usize,
    pub ma_period: usize,
    pub box_bars: usize,
    /// Measure the box over the trailing bars, search window included. A
    /// sane break bar then sits inside its own box and can never close deep
    /// enough below it.
    pub box_includes_search: bool,
    /// Trailing bars searched for (break, spring, confirm) triples.
    pub search_bars: usize,
    pub min_box_range: f64,
    pub max_box_range: f64,
    /// Break close must be at or below `box_low × break_depth`.
    pub break_depth: f64,
    pub break_volume_ratio: f64,
    /// Percent.
    pub confirm_pct: f64,
    pub confirm_volume_ratio: f64,
}

impl Default for SpringParams {
    fn default() -> Self {
        Self {
            threshold: 60,
            ma_period: 20,
            box_bars: 30,
            box_includes_search: false,
            search_bars: 5,
            min_box_range: 0.05,
            max_box_range: 0.15,
            break_depth: 0.98,
            break_volume_ratio: 1.5,
            confirm_pct: 2.0,
            confirm_volume_ratio: 1.3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpringDetector {
    params: SpringParams,
}

impl SpringDetector {
    pub fn new(params: SpringParams) -> Self {
        Self { params }
    }

    pub fn default_params() -> Self {
        Self::new(SpringParams::default())
    }
}

impl Detector for SpringDetector {
    fn name(&self) -> &str {
        "spring"
    }

    fn label(&self) -> &str {
        "Wyckoff spring"
    }

    fn min_bars(&self) -> usize {
        let p = &self.params;
        let window = if p.box_includes_search {
            p.box_bars.max(p.search_bars)
        } else {
            p.box_bars + p.search_bars
        };
        p.threshold.max(window).max(p.ma_period)
    }

    fn detect(&self, symbol: &Symbol, bars: &[Bar], ctx: &RunContext) -> Detection {
        let Some(view) = sample(self, symbol, bars, ctx) else {
            return Detection::no_match();
        };
        let p = &self.params;
        let data = &view[view.len() - self.min_bars()..];
        let close_ma = Sma::close(p.ma_period).compute(data);
        let vol_ma = Sma::volume(p.ma_period).compute(data);

        let search = data.len() - p.search_bars;
        let range_bars = if p.box_includes_search {
            &data[data.len() - p.box_bars..]
        } else {
            &data[search - p.box_bars..search]
        };
        let box_high = max_high(range_bars);
        let box_low = min_low(range_bars);
        let range = (box_high - box_low) / box_low;
        if !(p.min_box_range..=p.max_box_range).contains(&range) {
            return Detection::no_match();
        }

        for b in search..data.len().saturating_sub(2) {
            let (brk, spring, confirm) = (&data[b], &data[b + 1], &data[b + 2]);
            if brk.close > box_low * p.break_depth {
                continue;
            }
            if brk.volume > vol_ma[b] * p.break_volume_ratio {
                continue;
            }
            if spring.close < box_low {
                continue;
            }
            let confirmed = confirm.close > confirm.open
                && confirm.pct_change > p.confirm_pct
                && confirm.volume > vol_ma[b + 2] * p.confirm_volume_ratio;
            if !confirmed {
                continue;
            }

            let diagnostic = format!(
                "{symbol}: confirmed {} +{:.2}%, box [{box_low:.2}, {box_high:.2}] range {:.1}%",
                confirm.date,
                confirm.pct_change,
                range * 100.0,
            );
            info!(detector = self.name(), "{diagnostic}");
            return Detection::matched(confirm.date, diagnostic)
                .with("box_high", box_high)
                .with("box_low", box_low)
                .with("range", range)
                .with("break_close", brk.close)
                .with("confirm_vs_ma", confirm.close / close_ma[b + 2]);
        }
        Detection::no_match()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::ohlcv;

    fn spring_rows(break_volume: f64) -> Vec<(f64, f64, f64, f64, f64)> {
        let mut rows = vec![(105.0, 110.0, 100.0, 105.0, 1000.0); 55];
        rows.extend(vec![(104.0, 106.0, 102.0, 104.0, 1000.0); 2]);
        rows.push((100.0, 100.0, 96.0, 97.0, break_volume));
        rows.push((97.0, 101.5, 97.0, 101.0, 1000.0));
        rows.push((101.0, 104.5, 101.0, 104.03, 1500.0));
        rows
    }

    #[test]
    fn quiet_break_and_recovery_is_a_spring() {
        let bars = ohlcv(&spring_rows(1000.0));
        let d = SpringDetector::default_params().detect(
            &Symbol::new("600519", "Moutai"),
            &bars,
            &RunContext::live(),
        );
        assert!(d.matched, "{d:?}");
        assert_eq!(d.event_date, Some(bars[59].date));
        assert_eq!(d.metadata["box_low"], 100.0);
        assert_eq!(d.metadata["box_high"], 110.0);
    }

    #[test]
    fn panic_volume_on_the_break_is_not_a_spring() {
        let d = SpringDetector::default_params().detect(
            &Symbol::new("600519", ""),
            &ohlcv(&spring_rows(2000.0)),
            &RunContext::live(),
        );
        assert!(!d.matched);
    }

    #[test]
    fn wide_range_is_not_a_box() {
        let mut rows = spring_rows(1000.0);
        rows[40].1 = 120.0;
        let d = SpringDetector::default_params().detect(
            &Symbol::new("600519", ""),
            &ohlcv(&rows),
            &RunContext::live(),
        );
        assert!(!d.matched);
    }

    #[test]
    fn trailing_box_swallows_the_break() {
        let params = SpringParams {
            box_includes_search: true,
            ..SpringParams::default()
        };
        let bars = ohlcv(&spring_rows(1000.0));
        let d = SpringDetector::new(params.clone()).detect(
            &Symbol::new("600519", ""),
            &bars,
            &RunContext::live(),
        );
        assert!(!d.matched);
        assert_eq!(SpringDetector::new(params).min_bars(), 60);
    }

    #[test]
    fn trailing_box_parses_from_toml() {
        let p: SpringParams = toml::from_str("box_includes_search = true").unwrap();
        assert!(p.box_includes_search);
        assert_eq!(p.box_bars, 30);
        assert!(!SpringParams::default().box_includes_search);
    }

    #[test]
    fn as_of_before_confirmation_is_not_yet_a_spring() {
        let bars = ohlcv(&spring_rows(1000.0));
        let d = SpringDetector::default_params().detect(
            &Symbol::new("600519", ""),
            &bars,
            &RunContext::as_of(bars[58].date),
        );
        assert!(!d.matched);
    }
}
