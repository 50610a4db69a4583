//! Accumulation breakout - a tight box on drying volume, then a volume breakout.
//!
//! The consolidation window sits a few bars back from the latest bar so the
//! breakout bar (and the run-up right before it) does not widen the box.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{sample, Detection, Detector, RunContext};
use crate::domain::{Bar, Symbol};
use crate::indicators::{max_high, mean, min_low};

/// Thresholds for [`AccumulationDetector`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccumulationParams {
    pub min_bars: usize,
    /// Consolidation window length.
    pub box_bars: usize,
    /// Bars between the end of the window and the latest bar.
    pub breakout_gap: usize,
    pub min_range: f64,
    pub max_range: f64,
    /// Bars compared at each end of the window for volume contraction.
    pub contraction_bars: usize,
    pub max_contraction: f64,
    /// Percent.
    pub min_breakout_pct: f64,
    pub breakout_volume_ratio: f64,
}

impl Default for AccumulationParams {
    fn default() -> Self {
        Self {
            min_bars: 90,
            box_bars: 60,
            breakout_gap: 3,
            min_range: 0.10,
            max_range: 0.25,
            contraction_bars: 20,
            max_contraction: 0.70,
            min_breakout_pct: 3.0,
            breakout_volume_ratio: 1.5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AccumulationDetector {
    params: AccumulationParams,
}

impl AccumulationDetector {
    pub fn new(params: AccumulationParams) -> Self {
        Self { params }
    }

    pub fn default_params() -> Self {
        Self::new(AccumulationParams::default())
    }

    pub fn params(&self) -> &AccumulationParams {
        &self.params
    }
}

impl Detector for AccumulationDetector {
    fn name(&self) -> &str {
        "accumulation"
    }

    fn label(&self) -> &str {
        "Wyckoff accumulation"
    }

    fn min_bars(&self) -> usize {
        self.params
            .min_bars
            .max(self.params.box_bars + self.params.breakout_gap)
    }

    fn detect(&self, symbol: &Symbol, bars: &[Bar], ctx: &RunContext) -> Detection {
        let Some(bars) = sample(self, symbol, bars, ctx) else {
            return Detection::no_match();
        };
        let p = &self.params;
        let n = bars.len();
        let window = &bars[n - p.breakout_gap - p.box_bars..n - p.breakout_gap];

        let box_high = max_high(window);
        let box_low = min_low(window);
        let range = (box_high - box_low) / box_low;
        if !(p.min_range..=p.max_range).contains(&range) {
            return Detection::no_match();
        }

        let k = p.contraction_bars.min(window.len());
        let early = mean(window[..k].iter().map(|b| b.volume));
        let late = mean(window[window.len() - k..].iter().map(|b| b.volume));
        let contraction = late / early;
        let contracted = late <= early * p.max_contraction;
        if !contracted {
            return Detection::no_match();
        }

        let latest = &bars[n - 1];
        let avg_volume = mean(window.iter().map(|b| b.volume));
        let breakout = latest.close > box_high
            && latest.pct_change > p.min_breakout_pct
            && latest.volume > avg_volume * p.breakout_volume_ratio;
        if !breakout {
            return Detection::no_match();
        }

        let diagnostic = format!(
            "{symbol}: box {} bars [{box_low:.2}, {box_high:.2}] range {:.1}%, \
             volume contraction {contraction:.2}, breakout {:.2}% at {:.2}",
            window.len(),
            range * 100.0,
            latest.pct_change,
            latest.close,
        );
        info!(detector = self.name(), "{diagnostic}");

        Detection::matched(latest.date, diagnostic)
            .with("box_high", box_high)
            .with("box_low", box_low)
            .with("range", range)
            .with("contraction", contraction)
            .with("breakout_pct", latest.pct_change)
            .with("volume_ratio", latest.volume / avg_volume)
    }
}
