//! Simple Moving Average (SMA) over close or volume.
//!
//! Rolling mean over a lookback window, NaN until the window is full.
//! Lookback: period - 1 (first valid value at index period-1).

use super::Indicator;
use crate::domain::Bar;

/// Bar column an indicator reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Close,
    Volume,
}

impl Source {
    fn value(self, bar: &Bar) -> f64 {
        match self {
            Source::Close => bar.close,
            Source::Volume => bar.volume,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Source::Close => "close",
            Source::Volume => "volume",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    source: Source,
    name: String,
}

impl Sma {
    pub fn new(period: usize, source: Source) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            source,
            name: format!("sma_{}_{period}", source.label()),
        }
    }

    pub fn close(period: usize) -> Self {
        Self::new(period, Source::Close)
    }

    pub fn volume(period: usize) -> Self {
        Self::new(period, Source::Volume)
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];

        if n < self.period {
            return result;
        }

        let value = |i: usize| self.source.value(&bars[i]);

        let mut sum = 0.0;
        let mut nan_in_window = false;
        for i in 0..self.period {
            let v = value(i);
            if v.is_nan() {
                nan_in_window = true;
            }
            sum += v;
        }

        if !nan_in_window {
            result[self.period - 1] = sum / self.period as f64;
        }

        for i in self.period..n {
            let leaving = value(i - self.period);
            let entering = value(i);
            sum = sum - leaving + entering;

            // NaN poisons the running sum; rescan the window instead.
            if entering.is_nan() || leaving.is_nan() || nan_in_window {
                nan_in_window = false;
                sum = 0.0;
                for j in (i + 1 - self.period)..=i {
                    let v = value(j);
                    if v.is_nan() {
                        nan_in_window = true;
                    }
                    sum += v;
                }
                if nan_in_window {
                    continue;
                }
            }

            result[i] = sum / self.period as f64;
        }

        result
    }
}
