//! Volume/price divergence.
//!
//! Two readings of the same tape: shrinking volume with a steady price
//! (sellers exhausted, the buy-side reading) and heavy volume with no price
//! progress (supply absorbing demand, the sell warning).

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{sample, Detection, Detector, RunContext};
use crate::domain::{Bar, Symbol};
use crate::indicators::{Indicator, Sma};

/// Thresholds for [`DivergenceDetector`] and [`VolumeNoRiseDetector`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DivergenceParams {
    pub min_bars: usize,
    pub ma_period: usize,
    pub fast_volume_period: usize,
    /// Trailing bars inspected for shrink/stable days.
    pub recent_days: usize,
    pub shrink_ratio: f64,
    /// Percent.
    pub stable_pct: f64,
    pub min_shrink_days: usize,
    pub min_stable_days: usize,
    pub warning_min_bars: usize,
    pub warning_days: usize,
    pub surge_ratio: f64,
    /// Percent. A surge day with a smaller gain counts as stalled.
    pub stall_pct: f64,
    pub min_warning_days: usize,
}

impl Default for DivergenceParams {
    fn default() -> Self {
        Self {
            min_bars: 60,
            ma_period: 20,
            fast_volume_period: 5,
            recent_days: 5,
            shrink_ratio: 0.8,
            stable_pct: 3.0,
            min_shrink_days: 3,
            min_stable_days: 4,
            warning_min_bars: 30,
            warning_days: 3,
            surge_ratio: 1.5,
            stall_pct: 3.0,
            min_warning_days: 2,
        }
    }
}

/// Shrinking volume without a price decline.
#[derive(Debug, Clone)]
pub struct DivergenceDetector {
    params: DivergenceParams,
}

impl DivergenceDetector {
    pub fn new(params: DivergenceParams) -> Self {
        Self { params }
    }

    pub fn default_params() -> Self {
        Self::new(DivergenceParams::default())
    }

    /// Volume surge without a price rise on the latest bars (sell warning).
    pub fn volume_no_rise(&self, symbol: &Symbol, bars: &[Bar], ctx: &RunContext) -> bool {
        volume_no_rise(&self.params, symbol, ctx.view(bars)).is_some()
    }
}

impl Detector for DivergenceDetector {
    fn name(&self) -> &str {
        "divergence"
    }

    fn label(&self) -> &str {
        "Wyckoff shrink without decline"
    }

    fn min_bars(&self) -> usize {
        self.params
            .min_bars
            .max(self.params.ma_period)
            .max(self.params.recent_days)
    }

    fn detect(&self, symbol: &Symbol, bars: &[Bar], ctx: &RunContext) -> Detection {
        let Some(bars) = sample(self, symbol, bars, ctx) else {
            return Detection::no_match();
        };
        let p = &self.params;
        let n = bars.len();
        let vol_ma = Sma::volume(p.ma_period).compute(bars);
        let vol_fast = Sma::volume(p.fast_volume_period).compute(bars);
        let close_ma = Sma::close(p.ma_period).compute(bars);

        let mut shrink_days = 0;
        let mut stable_days = 0;
        for i in n - p.recent_days..n {
            if bars[i].volume < vol_ma[i] * p.shrink_ratio {
                shrink_days += 1;
            }
            if bars[i].pct_change.abs() < p.stable_pct {
                stable_days += 1;
            }
        }
        if shrink_days < p.min_shrink_days || stable_days < p.min_stable_days {
            return Detection::no_match();
        }

        let last = &bars[n - 1];
        if !(last.close >= close_ma[n - 1] && last.close >= last.open) {
            return Detection::no_match();
        }

        let vs_ma = last.volume / vol_ma[n - 1];
        let vs_fast = last.volume / vol_fast[n - 1];
        let diagnostic = format!(
            "{symbol}: {shrink_days}/{} shrink days, {stable_days}/{} stable days, \
             volume {:.0}% of MA{} and {:.0}% of MA{}, close {:.2}",
            p.recent_days,
            p.recent_days,
            vs_ma * 100.0,
            p.ma_period,
            vs_fast * 100.0,
            p.fast_volume_period,
            last.close,
        );
        info!(detector = self.name(), "{diagnostic}");

        Detection::matched(last.date, diagnostic)
            .with("shrink_days", shrink_days as f64)
            .with("stable_days", stable_days as f64)
            .with("volume_vs_ma", vs_ma)
            .with("volume_vs_fast_ma", vs_fast)
    }
}

/// The sell-warning half of the divergence check as a schedulable detector.
#[derive(Debug, Clone)]
pub struct VolumeNoRiseDetector {
    params: DivergenceParams,
}

impl VolumeNoRiseDetector {
    pub fn new(params: DivergenceParams) -> Self {
        Self { params }
    }

    pub fn default_params() -> Self {
        Self::new(DivergenceParams::default())
    }
}

impl Detector for VolumeNoRiseDetector {
    fn name(&self) -> &str {
        "volume_no_rise"
    }

    fn label(&self) -> &str {
        "Volume without rise (sell warning)"
    }

    fn min_bars(&self) -> usize {
        self.params
            .warning_min_bars
            .max(self.params.ma_period)
            .max(self.params.warning_days)
    }

    fn detect(&self, symbol: &Symbol, bars: &[Bar], ctx: &RunContext) -> Detection {
        let Some(bars) = sample(self, symbol, bars, ctx) else {
            return Detection::no_match();
        };
        match volume_no_rise(&self.params, symbol, bars) {
            Some(days) => {
                let last = &bars[bars.len() - 1];
                let diagnostic = format!(
                    "{symbol}: {days}/{} heavy days without a rise, close {:.2}",
                    self.params.warning_days, last.close
                );
                info!(detector = self.name(), "{diagnostic}");
                Detection::matched(last.date, diagnostic).with("warning_days", days as f64)
            }
            None => Detection::no_match(),
        }
    }
}

/// Count of stalled surge days among the latest bars, when it reaches the
/// warning threshold.
fn volume_no_rise(p: &DivergenceParams, symbol: &Symbol, bars: &[Bar]) -> Option<usize> {
    let min = p.warning_min_bars.max(p.ma_period).max(p.warning_days);
    if bars.len() < min {
        debug!(symbol = %symbol, "volume_no_rise: {} bars < {min}", bars.len());
        return None;
    }
    let n = bars.len();
    let vol_ma = Sma::volume(p.ma_period).compute(bars);
    let days = (n - p.warning_days..n)
        .filter(|&i| {
            let b = &bars[i];
            b.volume > vol_ma[i] * p.surge_ratio && (b.pct_change < p.stall_pct || b.close < b.open)
        })
        .count();
    (days >= p.min_warning_days).then_some(days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::ohlcv;

    fn quiet_then(tail: &[(f64, f64, f64, f64, f64)], lead: usize) -> Vec<Bar> {
        let mut rows = vec![(100.0, 101.0, 99.0, 100.0, 1000.0); lead];
        rows.extend_from_slice(tail);
        ohlcv(&rows)
    }

    #[test]
    fn shrinking_volume_on_flat_price_matches() {
        let mut tail = vec![(100.0, 101.0, 99.0, 100.0, 500.0); 4];
        tail.push((99.0, 101.0, 99.0, 100.0, 500.0));
        let bars = quiet_then(&tail, 55);
        let d = DivergenceDetector::default_params().detect(
            &Symbol::new("000001", "Ping An"),
            &bars,
            &RunContext::live(),
        );
        assert!(d.matched, "{d:?}");
        assert_eq!(d.metadata["shrink_days"], 5.0);
        assert_eq!(d.metadata["stable_days"], 5.0);
    }

    #[test]
    fn shrink_with_a_falling_close_is_rejected() {
        let mut tail = vec![(100.0, 101.0, 99.0, 100.0, 500.0); 4];
        tail.push((96.0, 96.5, 94.5, 95.0, 500.0));
        let bars = quiet_then(&tail, 55);
        let d = DivergenceDetector::default_params().detect(
            &Symbol::new("000001", ""),
            &bars,
            &RunContext::live(),
        );
        assert!(!d.matched);
    }

    #[test]
    fn normal_volume_is_not_a_divergence() {
        let bars = quiet_then(&[], 60);
        let d = DivergenceDetector::default_params().detect(
            &Symbol::new("000001", ""),
            &bars,
            &RunContext::live(),
        );
        assert!(!d.matched);
    }

    #[test]
    fn heavy_volume_without_rise_warns() {
        let tail = vec![(100.0, 101.0, 99.0, 100.0, 2000.0); 3];
        let bars = quiet_then(&tail, 27);
        let sym = Symbol::new("000001", "");
        assert!(DivergenceDetector::default_params().volume_no_rise(&sym, &bars, &RunContext::live()));
        let d = VolumeNoRiseDetector::default_params().detect(&sym, &bars, &RunContext::live());
        assert!(d.matched);
        assert_eq!(d.metadata["warning_days"], 3.0);
    }

    #[test]
    fn volume_no_rise_needs_thirty_bars() {
        let tail = vec![(100.0, 101.0, 99.0, 100.0, 2000.0); 3];
        let bars = quiet_then(&tail, 26);
        assert!(!DivergenceDetector::default_params().volume_no_rise(
            &Symbol::new("000001", ""),
            &bars,
            &RunContext::live()
        ));
    }

    #[test]
    fn surge_with_a_strong_rise_is_not_a_warning() {
        let tail = [
            (100.0, 105.0, 100.0, 104.0, 2000.0),
            (104.0, 108.0, 104.0, 108.0, 2000.0),
            (108.0, 112.0, 108.0, 112.0, 2000.0),
        ];
        let bars = quiet_then(&tail, 27);
        assert!(!DivergenceDetector::default_params().volume_no_rise(
            &Symbol::new("000001", ""),
            &bars,
            &RunContext::live()
        ));
    }
}
