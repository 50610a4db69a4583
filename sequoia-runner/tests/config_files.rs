//! Configuration files on disk.

use sequoia_core::detect::DetectorKind;
use sequoia_runner::{ConfigError, ScreenConfig};

#[test]
fn loads_a_full_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sequoia.toml");
    std::fs::write(
        &path,
        r#"
worker_count = 16
history_start = "2023-01-01"
detector_pause_ms = 0
detectors = ["accumulation", "volume_no_rise"]

[liquidity]
min_notional = 5e8
as_of_aware = true

[divergence]
surge_ratio = 2.0

[push]
enable = true
wxpusher_token = "AT_xxx"
topic_id = 12345

[schedule]
at = "15:30"
"#,
    )
    .unwrap();

    let config = ScreenConfig::from_file(&path).unwrap();
    assert_eq!(config.worker_count, 16);
    assert_eq!(
        config.detectors,
        vec![DetectorKind::Accumulation, DetectorKind::VolumeNoRise]
    );
    assert!(config.liquidity.as_of_aware);
    assert_eq!(config.divergence.surge_ratio, 2.0);
    assert_eq!(config.divergence.min_bars, 60);
    assert!(config.push.enable);
    assert_eq!(config.push.topic_id, 12345);
    assert_eq!(config.schedule.time().unwrap().to_string(), "15:30:00");
    assert!(config.detector_pause().is_zero());
}

#[test]
fn missing_file_is_an_io_error() {
    let err = ScreenConfig::from_file(std::path::Path::new("/nonexistent/sequoia.toml"))
        .unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn bad_schedule_time_is_rejected() {
    let err = ScreenConfig::from_toml("[schedule]\nat = \"quarter past three\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn as_of_before_history_is_rejected() {
    let err = ScreenConfig::from_toml(
        "history_start = \"2022-01-01\"\nas_of_date = \"2021-06-30\"\n",
    )
    .unwrap_err();
    assert!(err.to_string().contains("history_start"));
}
