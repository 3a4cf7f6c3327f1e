//! Windowing Error Types

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Invalid configuration values. Fatal, surfaced to the caller with no retry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Window size must be a positive sample count
    #[error("window_size must be positive, got {0}")]
    InvalidWindowSize(usize),

    /// Stride must be a positive sample count
    #[error("stride must be positive, got {0}")]
    InvalidStride(usize),

    /// Alert threshold must be a finite number
    #[error("threshold must be finite, got {0}")]
    InvalidThreshold(f64),
}

/// Records or windows that do not match the expected shape
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Field present but not a finite number
    #[error("{field} must be finite, got {value}")]
    NonFiniteValue { field: &'static str, value: f64 },

    /// Window end precedes its start
    #[error("window end {end} precedes start {start}")]
    InvertedSpan {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Errors from the batch windowing engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WindowingError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("record {index}: {source}")]
    Schema {
        index: usize,
        #[source]
        source: SchemaError,
    },

    #[error("invalid window: {0}")]
    Window(#[from] SchemaError),
}
