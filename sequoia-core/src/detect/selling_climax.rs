//! Selling climax, automatic rally, secondary test, then a confirmed rebound.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{sample, Detection, Detector, RunContext};
use crate::domain::{Bar, Symbol};
use crate::indicators::{Indicator, Sma};

/// Thresholds for [`SellingClimaxDetector`]. Percentages are in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SellingClimaxParams {
    pub min_bars: usize,
    /// Trailing bars searched for a climax.
    pub scan_bars: usize,
    /// Latest bars never considered as the climax itself.
    pub tail_reserve: usize,
    pub volume_ma_period: usize,
    pub climax_drop_pct: f64,
    pub climax_volume_ratio: f64,
    pub rally_days: usize,
    pub rally_pct: f64,
    /// Secondary test window, as offsets from the climax bar: `[start, end)`.
    pub test_start: usize,
    pub test_end: usize,
    pub min_test_bars: usize,
    pub test_low_tolerance: f64,
    pub test_volume_ratio: f64,
    pub confirm_pct: f64,
    pub min_rebound: f64,
}

impl Default for SellingClimaxParams {
    fn default() -> Self {
        Self {
            min_bars: 60,
            scan_bars: 30,
            tail_reserve: 5,
            volume_ma_period: 20,
            climax_drop_pct: 7.0,
            climax_volume_ratio: 2.0,
            rally_days: 3,
            rally_pct: 5.0,
            test_start: 3,
            test_end: 10,
            min_test_bars: 3,
            test_low_tolerance: 1.05,
            test_volume_ratio: 0.6,
            confirm_pct: 2.0,
            min_rebound: 1.05,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SellingClimaxDetector {
    params: SellingClimaxParams,
}

/// One climax that passed rally and test, before confirmation.
struct Climax<'a> {
    bar: &'a Bar,
    rally_high: f64,
}

impl SellingClimaxDetector {
    pub fn new(params: SellingClimaxParams) -> Self {
        Self { params }
    }

    pub fn default_params() -> Self {
        Self::new(SellingClimaxParams::default())
    }

    /// Climax at `recent[i]` followed by a rally and a low-volume retest.
    fn structure<'a>(&self, recent: &'a [Bar], vol_ma: &[f64], i: usize) -> Option<Climax<'a>> {
        let p = &self.params;
        let sc = &recent[i];
        if !(sc.pct_change < -p.climax_drop_pct && sc.volume > vol_ma[i] * p.climax_volume_ratio) {
            return None;
        }

        let rally_end = (i + 1 + p.rally_days).min(recent.len());
        let rally = recent[i + 1..rally_end]
            .iter()
            .find(|b| b.pct_change > p.rally_pct)?;

        let test_start = (i + p.test_start).min(recent.len());
        let test_end = (i + p.test_end).min(recent.len());
        let tests = &recent[test_start..test_end.max(test_start)];
        if tests.len() < p.min_test_bars {
            return None;
        }
        tests
            .iter()
            .find(|b| b.low <= sc.low * p.test_low_tolerance && b.volume < sc.volume * p.test_volume_ratio)?;

        Some(Climax {
            bar: sc,
            rally_high: rally.high,
        })
    }
}

impl Detector for SellingClimaxDetector {
    fn name(&self) -> &str {
        "selling_climax"
    }

    fn label(&self) -> &str {
        "Wyckoff selling-climax rebound"
    }

    fn min_bars(&self) -> usize {
        self.params.min_bars.max(self.params.scan_bars)
    }

    fn detect(&self, symbol: &Symbol, bars: &[Bar], ctx: &RunContext) -> Detection {
        let Some(bars) = sample(self, symbol, bars, ctx) else {
            return Detection::no_match();
        };
        let p = &self.params;
        let offset = bars.len() - p.scan_bars;
        let recent = &bars[offset..];
        let vol_ma = &Sma::volume(p.volume_ma_period).compute(bars)[offset..];
        let last = &recent[recent.len() - 1];

        let confirmed = last.close > last.open && last.pct_change > p.confirm_pct;
        if !confirmed {
            return Detection::no_match();
        }

        let climax = (0..recent.len().saturating_sub(p.tail_reserve))
            .filter_map(|i| self.structure(recent, vol_ma, i))
            .find(|c| last.close > c.bar.close * p.min_rebound);
        let Some(climax) = climax else {
            return Detection::no_match();
        };

        let sc = climax.bar;
        let rebound = (last.close / sc.close - 1.0) * 100.0;
        let diagnostic = format!(
            "{symbol}: climax {} drop {:.2}% volume {:.0}, rally high {:.2}, \
             rebound {rebound:.2}% (today {:.2}%)",
            sc.date, sc.pct_change, sc.volume, climax.rally_high, last.pct_change,
        );
        info!(detector = self.name(), "{diagnostic}");

        Detection::matched(sc.date, diagnostic)
            .with("climax_pct", sc.pct_change)
            .with("climax_volume", sc.volume)
            .with("rally_high", climax.rally_high)
            .with("rebound_pct", rebound)
    }
}
