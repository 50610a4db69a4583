//! Run configuration - one immutable value built at start-up and passed by
//! reference into the pipeline.

use std::path::Path;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sequoia_core::data::DEFAULT_WORKERS;
use sequoia_core::detect::{
    AccumulationParams, DetectorKind, DetectorParams, DivergenceParams, ParamError,
    SellingClimaxParams, SpringParams,
};
use sequoia_core::LiquidityFilter;

/// Errors loading or validating a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Params(#[from] ParamError),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Push channel settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    pub enable: bool,
    pub wxpusher_token: String,
    pub topic_id: u64,
}

/// Daily-mode trigger time, `HH:MM` local time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub at: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { at: "15:15".into() }
    }
}

impl ScheduleConfig {
    pub fn time(&self) -> Result<NaiveTime, ConfigError> {
        NaiveTime::parse_from_str(self.at.trim(), "%H:%M")
            .map_err(|e| ConfigError::Invalid(format!("schedule.at '{}': {e}", self.at)))
    }
}

/// Everything a screening run needs besides the universe and the data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    /// Screen as of this date instead of the latest bar (backtesting).
    pub as_of_date: Option<NaiveDate>,
    pub worker_count: usize,
    /// First day of history requested from the provider.
    pub history_start: NaiveDate,
    pub failure_backoff_ms: u64,
    pub detector_pause_ms: u64,
    /// Detectors to run, in reporting order.
    pub detectors: Vec<DetectorKind>,
    pub liquidity: LiquidityFilter,
    pub accumulation: AccumulationParams,
    pub divergence: DivergenceParams,
    pub selling_climax: SellingClimaxParams,
    pub spring: SpringParams,
    pub push: PushConfig,
    pub schedule: ScheduleConfig,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            as_of_date: None,
            worker_count: DEFAULT_WORKERS,
            history_start: NaiveDate::from_ymd_opt(2022, 1, 1).unwrap_or_default(),
            failure_backoff_ms: 500,
            detector_pause_ms: 2000,
            detectors: DetectorKind::WYCKOFF.to_vec(),
            liquidity: LiquidityFilter::default(),
            accumulation: AccumulationParams::default(),
            divergence: DivergenceParams::default(),
            selling_climax: SellingClimaxParams::default(),
            spring: SpringParams::default(),
            push: PushConfig::default(),
            schedule: ScheduleConfig::default(),
        }
    }
}

impl ScreenConfig {
    /// Load and validate a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate TOML config text. Missing keys take their defaults.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: ScreenConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == 0 {
            return Err(ConfigError::Invalid("worker_count must be >= 1".into()));
        }
        if self.detectors.is_empty() {
            return Err(ConfigError::Invalid("detectors must not be empty".into()));
        }
        if let Some(as_of) = self.as_of_date {
            if as_of < self.history_start {
                return Err(ConfigError::Invalid(format!(
                    "as_of_date {as_of} is before history_start {}",
                    self.history_start
                )));
            }
        }
        if self.liquidity.window == 0 {
            return Err(ConfigError::Invalid("liquidity.window must be >= 1".into()));
        }
        if self.push.enable && self.push.wxpusher_token.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "push.enable requires push.wxpusher_token".into(),
            ));
        }
        self.schedule.time()?;
        self.detector_params().validate()?;
        Ok(())
    }

    pub fn detector_params(&self) -> DetectorParams {
        DetectorParams {
            accumulation: self.accumulation.clone(),
            divergence: self.divergence.clone(),
            selling_climax: self.selling_climax.clone(),
            spring: self.spring.clone(),
        }
    }

    pub fn failure_backoff(&self) -> Duration {
        Duration::from_millis(self.failure_backoff_ms)
    }

    pub fn detector_pause(&self) -> Duration {
        Duration::from_millis(self.detector_pause_ms)
    }

    /// Apply command-line overrides on top of the file.
    pub fn with_overrides(mut self, as_of: Option<NaiveDate>, workers: Option<usize>) -> Self {
        if as_of.is_some() {
            self.as_of_date = as_of;
        }
        if let Some(w) = workers {
            self.worker_count = w;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_the_default_run() {
        let config = ScreenConfig::from_toml("").unwrap();
        assert_eq!(config, ScreenConfig::default());
        assert_eq!(config.worker_count, 8);
        assert_eq!(config.detectors, DetectorKind::WYCKOFF.to_vec());
        assert_eq!(config.liquidity.min_notional, 3e8);
        assert_eq!(config.schedule.time().unwrap(), NaiveTime::from_hms_opt(15, 15, 0).unwrap());
    }

    #[test]
    fn thresholds_are_overridable() {
        let config = ScreenConfig::from_toml(
            r#"
            as_of_date = "2024-06-28"
            worker_count = 4
            detectors = ["spring", "volume_no_rise"]

            [liquidity]
            min_notional = 1e8

            [accumulation]
            max_range = 0.30

            [spring]
            threshold = 80
            "#,
        )
        .unwrap();
        assert_eq!(config.as_of_date, NaiveDate::from_ymd_opt(2024, 6, 28));
        assert_eq!(config.worker_count, 4);
        assert_eq!(
            config.detectors,
            vec![DetectorKind::Spring, DetectorKind::VolumeNoRise]
        );
        assert_eq!(config.liquidity.min_notional, 1e8);
        assert_eq!(config.liquidity.window, 10);
        assert_eq!(config.detector_params().accumulation.max_range, 0.30);
        assert_eq!(config.detector_params().accumulation.min_range, 0.10);
        assert_eq!(config.spring.threshold, 80);
    }

    #[test]
    fn zero_workers_is_rejected() {
        let err = ScreenConfig::from_toml("worker_count = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn push_without_token_is_rejected() {
        let err = ScreenConfig::from_toml("[push]\nenable = true\n").unwrap_err();
        assert!(err.to_string().contains("wxpusher_token"));
    }

    #[test]
    fn unknown_detector_is_a_parse_error() {
        let err = ScreenConfig::from_toml(r#"detectors = ["wedge"]"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let err = ScreenConfig::from_toml("[accumulation]\nmin_range = 0.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Params(_)));
    }

    #[test]
    fn overrides_win_over_file() {
        let config = ScreenConfig::default()
            .with_overrides(NaiveDate::from_ymd_opt(2024, 1, 5), Some(2));
        assert_eq!(config.as_of_date, NaiveDate::from_ymd_opt(2024, 1, 5));
        assert_eq!(config.worker_count, 2);
        let untouched = config.clone().with_overrides(None, None);
        assert_eq!(untouched, config);
    }
}
