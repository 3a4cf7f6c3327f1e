//! Mean Absolute Z-score Detector

use crate::detector::{check_width, column_moments, reference_rows, Detector};
use crate::DetectorError;

/// Scores a row by the mean |z| of its columns against the training
/// population.
#[derive(Debug, Clone, Default)]
pub struct ZScoreDetector {
    means: Vec<f64>,
    scales: Vec<f64>,
    fitted: bool,
}

impl ZScoreDetector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Detector for ZScoreDetector {
    fn name(&self) -> &'static str {
        "zscore"
    }

    fn fit(&mut self, rows: &[Vec<f64>], labels: Option<&[bool]>) -> Result<(), DetectorError> {
        let reference = reference_rows(rows, labels)?;
        let (means, scales) = column_moments(&reference);
        self.means = means;
        self.scales = scales;
        self.fitted = true;
        Ok(())
    }

    fn score_samples(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, DetectorError> {
        if !self.fitted {
            return Err(DetectorError::NotFitted(self.name()));
        }
        check_width(rows, self.means.len())?;

        let width = self.means.len().max(1) as f64;
        Ok(rows
            .iter()
            .map(|row| {
                row.iter()
                    .zip(self.means.iter().zip(&self.scales))
                    .map(|(x, (m, s))| ((x - m) / s).abs())
                    .sum::<f64>()
                    / width
            })
            .collect())
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }
}
