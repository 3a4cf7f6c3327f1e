//! Alert Event

use chrono::{DateTime, Utc};
use feature_engine::FeatureVector;
use serde::{Deserialize, Serialize};
use signal_window::Window;

/// Emitted for a scored window whose score met the threshold.
///
/// Window bounds serialise as ISO-8601 (RFC 3339) strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub asset_id: String,
    pub channel: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub score: f64,
    /// Full feature vector the score was computed from
    pub features: FeatureVector,
}

impl Alert {
    pub fn new(window: &Window, score: f64, features: FeatureVector) -> Self {
        Self {
            asset_id: window.asset_id().to_string(),
            channel: window.channel().to_string(),
            window_start: window.start(),
            window_end: window.end(),
            score,
            features,
        }
    }
}
