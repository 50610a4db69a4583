//! Window statistics shared by the detectors.

use crate::domain::Bar;

/// Arithmetic mean; NaN for an empty input.
pub fn mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Highest high in the window (NEG_INFINITY when empty).
pub fn max_high(bars: &[Bar]) -> f64 {
    bars.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max)
}

/// Lowest low in the window (INFINITY when empty).
pub fn min_low(bars: &[Bar]) -> f64 {
    bars.iter().map(|b| b.low).fold(f64::INFINITY, f64::min)
}
