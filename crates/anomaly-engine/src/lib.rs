//! Anomaly Detection Engine
//!
//! Pluggable detectors behind a closed factory, persisted score calibration,
//! holdout evaluation metrics, model selection, feature drift checks and a
//! frequency band scan.

pub mod band_scan;
mod calibration;
mod detector;
pub mod drift;
mod hbos;
mod knn;
pub mod metrics;
mod model;
mod selection;
mod zscore;

pub use band_scan::{scan_frequency_bands, BandScanResult};
pub use calibration::CalibrationModel;
pub use detector::{AnomalyDetector, Availability, Detector, DetectorKind, DetectorSpec};
pub use hbos::HbosDetector;
pub use knn::KnnDetector;
pub use metrics::EvaluationMetrics;
pub use model::ScoringModel;
pub use selection::{holdout_split, Candidate, ModelSelector, Selection};
pub use zscore::ZScoreDetector;

use thiserror::Error;

/// Errors raised by detectors and scoring models
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectorError {
    #[error("Detector {0} used before fit")]
    NotFitted(&'static str),
    #[error("Cannot fit on an empty feature matrix")]
    EmptyTrainingSet,
    #[error("Feature width mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("Label count {labels} does not match row count {rows}")]
    LabelMismatch { rows: usize, labels: usize },
    #[error("Detector {detector} unavailable: requires {capability}")]
    Unavailable {
        detector: DetectorKind,
        capability: &'static str,
    },
    #[error("Cannot calibrate on an empty score set")]
    EmptyScores,
}

/// Errors during model selection
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SelectionError {
    #[error("No candidate detectors to select from")]
    NoCandidates,
    #[error("Label count {labels} does not match row count {rows}")]
    LabelMismatch { rows: usize, labels: usize },
    #[error(transparent)]
    Detector(#[from] DetectorError),
}
