//! Stream Scorer Configuration

use feature_engine::FeatureConfig;
use serde::{Deserialize, Serialize};
use signal_window::{ConfigError, WindowConfig};

/// Default alert threshold on the (calibrated) score
pub const DEFAULT_THRESHOLD: f64 = 0.9;

/// Live series count past which a warning is logged once
pub const DEFAULT_MAX_KEYS: usize = 10_000;

/// Streaming configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Buffer capacity and scoring cadence
    pub window: WindowConfig,
    /// Alerts fire when score >= threshold
    pub threshold: f64,
    /// Feature families computed per window
    pub features: FeatureConfig,
    /// Soft limit on live series; buffers are never evicted
    pub max_keys: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            threshold: DEFAULT_THRESHOLD,
            features: FeatureConfig::default(),
            max_keys: DEFAULT_MAX_KEYS,
        }
    }
}

impl StreamConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.window.validate()?;
        if !self.threshold.is_finite() {
            return Err(ConfigError::InvalidThreshold(self.threshold));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StreamConfig::default();
        assert_eq!(config.window.size, 256);
        assert_eq!(config.window.stride, 128);
        assert_eq!(config.threshold, 0.9);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let config = StreamConfig {
            threshold: f64::NAN,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidThreshold(_))));

        let config = StreamConfig {
            window: WindowConfig::new(64, 0),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidStride(0)));
    }

    #[test]
    fn test_partial_json() {
        let config: StreamConfig =
            serde_json::from_str(r#"{"threshold": 0.5, "window": {"size": 50, "stride": 25}}"#).unwrap();
        assert_eq!(config.threshold, 0.5);
        assert_eq!(config.window, WindowConfig::new(50, 25));
        assert_eq!(config.features, FeatureConfig::default());
    }
}
