//! Real-Time Stream Scoring
//!
//! Buffers live records per (asset, channel), scores a window every `stride`
//! admitted records once a buffer is full, and emits an alert for each
//! window whose score meets the threshold.

mod alert;
mod config;
mod scorer;
mod sink;

pub use alert::Alert;
pub use config::{StreamConfig, DEFAULT_MAX_KEYS, DEFAULT_THRESHOLD};
pub use scorer::{StreamScorer, StreamStats};
pub use sink::{AlertSink, ChannelSink, JsonLinesSink, VecSink};

use anomaly_engine::DetectorError;
use signal_window::{ConfigError, SchemaError};
use thiserror::Error;

/// Errors raised while scoring a stream
#[derive(Debug, Error)]
pub enum ScorerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Malformed record; only that record is lost
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// Detector failure; fatal for the stream
    #[error(transparent)]
    Detector(#[from] DetectorError),
    #[error("Alert sink failed: {0}")]
    Sink(String),
}
