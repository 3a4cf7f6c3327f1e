//! Pipeline Configuration
//!
//! Loaded from an optional file (TOML, YAML or JSON by extension) with
//! `ESI_`-prefixed environment variables layered on top, `__` separating
//! nested keys: `ESI_STREAM__THRESHOLD=0.8`.

use alerting::StreamConfig;
use anomaly_engine::DetectorSpec;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for the `esi-pipeline` binary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub logging: LoggingConfig,
    pub training: TrainingConfig,
    /// Shared by training and live scoring: window geometry and features
    pub stream: StreamConfig,
    pub replay: ReplayConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON log lines instead of human-readable text
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// JSON-lines file of historical records
    pub input: PathBuf,
    /// Optional JSON array of per-window anomaly labels, in matrix row order
    pub labels: Option<PathBuf>,
    /// Candidate detectors, in preference order
    pub detectors: Vec<DetectorSpec>,
    /// Trailing share of windows held out for selection
    pub holdout_fraction: f64,
    /// Calibrate scores onto [0, 1]
    pub calibrate: bool,
    /// Frequency bands for the post-training band scan; 0 disables it
    pub n_bands: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("data/training.jsonl"),
            labels: None,
            detectors: vec![DetectorSpec::default()],
            holdout_fraction: 0.2,
            calibrate: true,
            n_bands: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Pause between replayed records (ms); 0 replays as fast as possible
    pub delay_ms: u64,
    /// Bounded channel depth between reader and scorer
    pub channel_capacity: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            delay_ms: 0,
            channel_capacity: 1024,
        }
    }
}

impl PipelineConfig {
    /// Load from `path` (if any) and the environment, then validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("ESI")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let loaded: PipelineConfig = builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;
        loaded.stream.validate().context("Invalid stream configuration")?;
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anomaly_engine::DetectorKind;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.stream.threshold, 0.9);
        assert_eq!(config.training.detectors, vec![DetectorSpec::default()]);
        assert_eq!(config.replay.delay_ms, 0);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.training.n_bands, 10);
    }

    #[test]
    fn test_load_toml_file() {
        let path = std::env::temp_dir().join(format!("esi-pipeline-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[training]
input = "history.jsonl"
calibrate = false

[[training.detectors]]
kind = "knn"
k = 7

[stream]
threshold = 0.75

[stream.window]
size = 128
stride = 32

[stream.features.toggles]
orders = false
"#
        )
        .unwrap();

        let config = PipelineConfig::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.training.input, PathBuf::from("history.jsonl"));
        assert!(!config.training.calibrate);
        assert_eq!(config.training.detectors[0].kind, DetectorKind::Knn);
        assert_eq!(config.training.detectors[0].k, 7);
        assert_eq!(config.stream.threshold, 0.75);
        assert_eq!(config.stream.window.size, 128);
        assert_eq!(config.stream.window.stride, 32);
        assert!(!config.stream.features.toggles.orders);
        assert!(config.stream.features.toggles.time);
    }

    #[test]
    fn test_missing_file_fails() {
        let path = Path::new("/nonexistent/esi.toml");
        assert!(PipelineConfig::load(Some(path)).is_err());
    }
}
