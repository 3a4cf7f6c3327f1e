//! Detector Capability and Factory

use crate::hbos::HbosDetector;
use crate::knn::KnnDetector;
use crate::zscore::ZScoreDetector;
use crate::DetectorError;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Fit/score contract every anomaly scorer implements.
///
/// Scores are raw and unbounded, higher means more anomalous. Fitting again
/// replaces all learned state.
pub trait Detector {
    /// Stable detector name
    fn name(&self) -> &'static str;

    /// Learn from a feature matrix. When labels are given, rows labelled
    /// anomalous are left out of the reference population.
    fn fit(&mut self, rows: &[Vec<f64>], labels: Option<&[bool]>) -> Result<(), DetectorError>;

    /// Score rows; fails with `NotFitted` before `fit`
    fn score_samples(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, DetectorError>;

    fn is_fitted(&self) -> bool;
}

/// Closed set of detector kinds known to the factory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    ZScore,
    Hbos,
    Knn,
    IsolationForest,
    OneClassSvm,
    Autoencoder,
    Lof,
    StlResidual,
    ArimaResidual,
}

impl DetectorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectorKind::ZScore => "zscore",
            DetectorKind::Hbos => "hbos",
            DetectorKind::Knn => "knn",
            DetectorKind::IsolationForest => "isolation_forest",
            DetectorKind::OneClassSvm => "one_class_svm",
            DetectorKind::Autoencoder => "autoencoder",
            DetectorKind::Lof => "lof",
            DetectorKind::StlResidual => "stl_residual",
            DetectorKind::ArimaResidual => "arima_residual",
        }
    }

    /// Capability a kind needs beyond this crate, if any
    pub fn required_capability(&self) -> Option<&'static str> {
        match self {
            DetectorKind::ZScore | DetectorKind::Hbos | DetectorKind::Knn => None,
            DetectorKind::IsolationForest => Some("tree-ensemble backend"),
            DetectorKind::OneClassSvm => Some("kernel-svm backend"),
            DetectorKind::Autoencoder => Some("neural-network runtime"),
            DetectorKind::Lof => Some("local-outlier-factor backend"),
            DetectorKind::StlResidual => Some("seasonal-decomposition backend"),
            DetectorKind::ArimaResidual => Some("arima forecasting backend"),
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of asking the factory for a detector, decided at construction
#[derive(Debug)]
pub enum Availability<T> {
    Available(T),
    Unavailable {
        detector: DetectorKind,
        capability: &'static str,
    },
}

impl<T> Availability<T> {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available(_))
    }

    pub fn into_result(self) -> Result<T, DetectorError> {
        match self {
            Availability::Available(value) => Ok(value),
            Availability::Unavailable {
                detector,
                capability,
            } => Err(DetectorError::Unavailable {
                detector,
                capability,
            }),
        }
    }
}

/// Detector choice plus its hyper-parameters, as read from configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSpec {
    pub kind: DetectorKind,
    /// Histogram bins (hbos)
    pub n_bins: usize,
    /// Neighbours (knn)
    pub k: usize,
}

impl Default for DetectorSpec {
    fn default() -> Self {
        Self {
            kind: DetectorKind::Hbos,
            n_bins: 15,
            k: 5,
        }
    }
}

impl DetectorSpec {
    pub fn new(kind: DetectorKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Factory table: build an unfitted detector for this spec
    pub fn build(&self) -> Availability<AnomalyDetector> {
        let detector = match self.kind {
            DetectorKind::ZScore => AnomalyDetector::ZScore(ZScoreDetector::new()),
            DetectorKind::Hbos => AnomalyDetector::Hbos(HbosDetector::new(self.n_bins)),
            DetectorKind::Knn => AnomalyDetector::Knn(KnnDetector::new(self.k)),
            other => {
                let capability = other.required_capability().unwrap_or("unknown");
                debug!("Detector {} unavailable: missing {}", other, capability);
                return Availability::Unavailable {
                    detector: other,
                    capability,
                };
            }
        };
        info!("Built detector {}", self.kind);
        Availability::Available(detector)
    }
}

/// Built-in detectors
#[derive(Debug, Clone)]
pub enum AnomalyDetector {
    ZScore(ZScoreDetector),
    Hbos(HbosDetector),
    Knn(KnnDetector),
}

impl AnomalyDetector {
    pub fn kind(&self) -> DetectorKind {
        match self {
            AnomalyDetector::ZScore(_) => DetectorKind::ZScore,
            AnomalyDetector::Hbos(_) => DetectorKind::Hbos,
            AnomalyDetector::Knn(_) => DetectorKind::Knn,
        }
    }

    fn inner(&self) -> &dyn Detector {
        match self {
            AnomalyDetector::ZScore(d) => d,
            AnomalyDetector::Hbos(d) => d,
            AnomalyDetector::Knn(d) => d,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Detector {
        match self {
            AnomalyDetector::ZScore(d) => d,
            AnomalyDetector::Hbos(d) => d,
            AnomalyDetector::Knn(d) => d,
        }
    }
}

impl Detector for AnomalyDetector {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn fit(&mut self, rows: &[Vec<f64>], labels: Option<&[bool]>) -> Result<(), DetectorError> {
        self.inner_mut().fit(rows, labels)
    }

    fn score_samples(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, DetectorError> {
        self.inner().score_samples(rows)
    }

    fn is_fitted(&self) -> bool {
        self.inner().is_fitted()
    }
}

/// Rows a detector should learn from: every row, or only the normal ones
/// when labels are given (all rows if none are normal).
pub(crate) fn reference_rows<'a>(
    rows: &'a [Vec<f64>],
    labels: Option<&[bool]>,
) -> Result<Vec<&'a Vec<f64>>, DetectorError> {
    if rows.is_empty() {
        return Err(DetectorError::EmptyTrainingSet);
    }
    let width = rows[0].len();
    if let Some(bad) = rows.iter().find(|r| r.len() != width) {
        return Err(DetectorError::DimensionMismatch {
            expected: width,
            actual: bad.len(),
        });
    }

    match labels {
        None => Ok(rows.iter().collect()),
        Some(labels) if labels.len() != rows.len() => Err(DetectorError::LabelMismatch {
            rows: rows.len(),
            labels: labels.len(),
        }),
        Some(labels) => {
            let normal: Vec<_> = rows
                .iter()
                .zip(labels)
                .filter(|(_, &anomalous)| !anomalous)
                .map(|(r, _)| r)
                .collect();
            if normal.is_empty() {
                Ok(rows.iter().collect())
            } else {
                Ok(normal)
            }
        }
    }
}

/// Check every row against the fitted width
pub(crate) fn check_width(rows: &[Vec<f64>], expected: usize) -> Result<(), DetectorError> {
    match rows.iter().find(|r| r.len() != expected) {
        Some(bad) => Err(DetectorError::DimensionMismatch {
            expected,
            actual: bad.len(),
        }),
        None => Ok(()),
    }
}

/// Per-column location and scale; constant columns fall back to the
/// magnitude of their level (at least 1) as scale.
pub(crate) fn column_moments(rows: &[&Vec<f64>]) -> (Vec<f64>, Vec<f64>) {
    let width = rows.first().map(|r| r.len()).unwrap_or(0);
    let n = rows.len() as f64;
    let mut means = vec![0.0; width];
    let mut scales = vec![0.0; width];
    for j in 0..width {
        let mean = rows.iter().map(|r| r[j]).sum::<f64>() / n;
        let var = rows.iter().map(|r| (r[j] - mean).powi(2)).sum::<f64>() / n;
        let std = var.sqrt();
        means[j] = mean;
        scales[j] = if std > 1e-12 { std } else { mean.abs().max(1.0) };
    }
    (means, scales)
}
