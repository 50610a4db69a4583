//! Detector registry: configuration keys to boxed detectors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{
    AccumulationDetector, AccumulationParams, Detector, DivergenceDetector, DivergenceParams,
    SellingClimaxDetector, SellingClimaxParams, SpringDetector, SpringParams,
    VolumeNoRiseDetector,
};

/// Built-in detectors, by configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    Accumulation,
    Divergence,
    VolumeNoRise,
    SellingClimax,
    Spring,
}

impl DetectorKind {
    /// The four buy-side patterns, in reporting order.
    pub const WYCKOFF: [DetectorKind; 4] = [
        DetectorKind::Accumulation,
        DetectorKind::Divergence,
        DetectorKind::SellingClimax,
        DetectorKind::Spring,
    ];

    pub const ALL: [DetectorKind; 5] = [
        DetectorKind::Accumulation,
        DetectorKind::Divergence,
        DetectorKind::VolumeNoRise,
        DetectorKind::SellingClimax,
        DetectorKind::Spring,
    ];

    pub fn key(self) -> &'static str {
        match self {
            DetectorKind::Accumulation => "accumulation",
            DetectorKind::Divergence => "divergence",
            DetectorKind::VolumeNoRise => "volume_no_rise",
            DetectorKind::SellingClimax => "selling_climax",
            DetectorKind::Spring => "spring",
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for DetectorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DetectorKind::ALL
            .into_iter()
            .find(|k| k.key() == s.trim())
            .ok_or_else(|| {
                let known: Vec<_> = DetectorKind::ALL.iter().map(|k| k.key()).collect();
                format!("unknown detector '{s}' (expected one of: {})", known.join(", "))
            })
    }
}

/// All detector thresholds, one table per detector in the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorParams {
    pub accumulation: AccumulationParams,
    pub divergence: DivergenceParams,
    pub selling_climax: SellingClimaxParams,
    pub spring: SpringParams,
}

/// A threshold table that cannot describe a sensible pattern.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid {detector} parameters: {reason}")]
pub struct ParamError {
    pub detector: &'static str,
    pub reason: String,
}

fn check(detector: &'static str, ok: bool, reason: &str) -> Result<(), ParamError> {
    if ok {
        Ok(())
    } else {
        Err(ParamError {
            detector,
            reason: reason.to_string(),
        })
    }
}

impl DetectorParams {
    pub fn validate(&self) -> Result<(), ParamError> {
        let a = &self.accumulation;
        check("accumulation", a.box_bars >= 1, "box_bars must be >= 1")?;
        check(
            "accumulation",
            a.contraction_bars >= 1 && a.contraction_bars <= a.box_bars,
            "contraction_bars must be in 1..=box_bars",
        )?;
        check(
            "accumulation",
            a.min_range <= a.max_range,
            "min_range must not exceed max_range",
        )?;

        let d = &self.divergence;
        check(
            "divergence",
            d.ma_period >= 1 && d.fast_volume_period >= 1,
            "moving-average periods must be >= 1",
        )?;
        check("divergence", d.recent_days >= 1, "recent_days must be >= 1")?;
        check("divergence", d.warning_days >= 1, "warning_days must be >= 1")?;

        let s = &self.selling_climax;
        check(
            "selling_climax",
            s.volume_ma_period >= 1,
            "volume_ma_period must be >= 1",
        )?;
        check(
            "selling_climax",
            s.tail_reserve < s.scan_bars,
            "tail_reserve must be smaller than scan_bars",
        )?;
        check(
            "selling_climax",
            s.test_start <= s.test_end,
            "test_start must not exceed test_end",
        )?;

        let p = &self.spring;
        check("spring", p.ma_period >= 1, "ma_period must be >= 1")?;
        check("spring", p.box_bars >= 1, "box_bars must be >= 1")?;
        check("spring", p.search_bars >= 3, "search_bars must be >= 3")?;
        check(
            "spring",
            p.min_box_range <= p.max_box_range,
            "min_box_range must not exceed max_box_range",
        )?;
        Ok(())
    }
}

pub fn build_detector(kind: DetectorKind, params: &DetectorParams) -> Box<dyn Detector> {
    match kind {
        DetectorKind::Accumulation => {
            Box::new(AccumulationDetector::new(params.accumulation.clone()))
        }
        DetectorKind::Divergence => Box::new(DivergenceDetector::new(params.divergence.clone())),
        DetectorKind::VolumeNoRise => {
            Box::new(VolumeNoRiseDetector::new(params.divergence.clone()))
        }
        DetectorKind::SellingClimax => {
            Box::new(SellingClimaxDetector::new(params.selling_climax.clone()))
        }
        DetectorKind::Spring => Box::new(SpringDetector::new(params.spring.clone())),
    }
}

/// Detectors in the order given; that order is the reporting order.
pub fn build_detectors(kinds: &[DetectorKind], params: &DetectorParams) -> Vec<Box<dyn Detector>> {
    kinds.iter().map(|&k| build_detector(k, params)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_detectors_report_their_keys_in_order() {
        let detectors = build_detectors(&DetectorKind::ALL, &DetectorParams::default());
        let names: Vec<_> = detectors.iter().map(|d| d.name().to_string()).collect();
        let keys: Vec<_> = DetectorKind::ALL.iter().map(|k| k.key().to_string()).collect();
        assert_eq!(names, keys);
    }

    #[test]
    fn default_minimum_samples() {
        let p = DetectorParams::default();
        let min = |k| build_detector(k, &p).min_bars();
        assert_eq!(min(DetectorKind::Accumulation), 90);
        assert_eq!(min(DetectorKind::Divergence), 60);
        assert_eq!(min(DetectorKind::VolumeNoRise), 30);
        assert_eq!(min(DetectorKind::SellingClimax), 60);
        assert_eq!(min(DetectorKind::Spring), 60);
    }

    #[test]
    fn kind_parses_from_key() {
        assert_eq!("spring".parse::<DetectorKind>(), Ok(DetectorKind::Spring));
        assert_eq!(
            " selling_climax ".parse::<DetectorKind>(),
            Ok(DetectorKind::SellingClimax)
        );
        assert!("wedge".parse::<DetectorKind>().is_err());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let p: DetectorParams = toml::from_str(
            r#"
            [spring]
            threshold = 80
            "#,
        )
        .unwrap();
        assert_eq!(p.spring.threshold, 80);
        assert_eq!(p.spring.box_bars, 30);
        assert_eq!(p.accumulation, AccumulationParams::default());
        assert!(p.validate().is_ok());
    }

    #[test]
    fn inverted_range_is_rejected() {
        let mut p = DetectorParams::default();
        p.spring.min_box_range = 0.2;
        let err = p.validate().unwrap_err();
        assert_eq!(err.detector, "spring");
    }
}
