//! Trained Scoring Model

use crate::calibration::CalibrationModel;
use crate::detector::{AnomalyDetector, Detector, DetectorSpec};
use crate::DetectorError;
use feature_engine::{FeatureMatrix, FeatureVector};
use tracing::{debug, info};

/// A fitted detector bound to the ordered feature columns it was trained
/// on, with optional calibration onto [0, 1].
#[derive(Debug, Clone)]
pub struct ScoringModel {
    columns: Vec<String>,
    detector: AnomalyDetector,
    calibration: Option<CalibrationModel>,
}

impl ScoringModel {
    /// Wrap an already fitted detector
    pub fn new(
        columns: Vec<String>,
        detector: AnomalyDetector,
        calibration: Option<CalibrationModel>,
    ) -> Self {
        Self {
            columns,
            detector,
            calibration,
        }
    }

    /// Build, fit and optionally calibrate a detector on a feature matrix.
    ///
    /// Calibration is fitted on the training scores themselves; labels, when
    /// given, both exclude anomalous rows from the detector's reference set
    /// and select logistic calibration.
    pub fn train(
        spec: &DetectorSpec,
        matrix: &FeatureMatrix,
        labels: Option<&[bool]>,
        calibrate: bool,
    ) -> Result<Self, DetectorError> {
        Self::fit_detector(spec.build().into_result()?, matrix, labels, calibrate)
    }

    /// Fit and optionally calibrate a detector the factory already built
    pub fn fit_detector(
        mut detector: AnomalyDetector,
        matrix: &FeatureMatrix,
        labels: Option<&[bool]>,
        calibrate: bool,
    ) -> Result<Self, DetectorError> {
        detector.fit(matrix.rows(), labels)?;

        let calibration = if calibrate {
            let scores = detector.score_samples(matrix.rows())?;
            Some(CalibrationModel::fit(&scores, labels)?)
        } else {
            None
        };

        info!(
            "Trained {} on {} rows x {} columns (calibrated: {})",
            detector.name(),
            matrix.len(),
            matrix.columns().len(),
            calibration.is_some()
        );

        Ok(Self {
            columns: matrix.columns().to_vec(),
            detector,
            calibration,
        })
    }

    /// Feature-column order the detector expects
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn detector(&self) -> &AnomalyDetector {
        &self.detector
    }

    pub fn calibration(&self) -> Option<&CalibrationModel> {
        self.calibration.as_ref()
    }

    pub fn is_fitted(&self) -> bool {
        self.detector.is_fitted()
    }

    /// Score rows already laid out in `columns()` order
    pub fn score_rows(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, DetectorError> {
        let raw = self.detector.score_samples(rows)?;
        Ok(match &self.calibration {
            Some(calibration) => calibration.transform(&raw),
            None => raw,
        })
    }

    /// Score a matrix whose columns may differ; columns are matched by name
    /// and missing ones read 0.0
    pub fn score_matrix(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>, DetectorError> {
        if matrix.columns() == self.columns.as_slice() {
            return self.score_rows(matrix.rows());
        }
        let positions: Vec<Option<usize>> = self
            .columns
            .iter()
            .map(|c| matrix.column_index(c))
            .collect();
        let rows: Vec<Vec<f64>> = matrix
            .rows()
            .iter()
            .map(|row| {
                positions
                    .iter()
                    .map(|p| p.map_or(0.0, |idx| row[idx]))
                    .collect()
            })
            .collect();
        self.score_rows(&rows)
    }

    /// Score one live feature vector
    pub fn score_vector(&self, features: &FeatureVector) -> Result<f64, DetectorError> {
        let row = features.reindex(&self.columns);
        let scores = self.score_rows(std::slice::from_ref(&row))?;
        let score = scores.first().copied().unwrap_or(0.0);
        debug!("Scored vector with {} features: {}", features.len(), score);
        Ok(score)
    }
}
