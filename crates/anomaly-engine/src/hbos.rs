//! Histogram-Based Outlier Score

use crate::detector::{check_width, reference_rows, Detector};
use crate::DetectorError;

/// Probability floor for empty and out-of-range bins
const MASS_FLOOR: f64 = 1e-8;

#[derive(Debug, Clone)]
struct Histogram {
    min: f64,
    width: f64,
    mass: Vec<f64>,
}

impl Histogram {
    fn fit(values: &[f64], bins: usize) -> Self {
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let n = values.len() as f64;

        if max - min <= 0.0 {
            return Self {
                min,
                width: 0.0,
                mass: vec![1.0],
            };
        }

        let width = (max - min) / bins as f64;
        let mut counts = vec![0usize; bins];
        for &v in values {
            let idx = (((v - min) / width) as usize).min(bins - 1);
            counts[idx] += 1;
        }
        Self {
            min,
            width,
            mass: counts.iter().map(|&c| c as f64 / n).collect(),
        }
    }

    fn mass_at(&self, value: f64) -> f64 {
        if self.width == 0.0 {
            return if value == self.min { 1.0 } else { MASS_FLOOR };
        }
        let max = self.min + self.width * self.mass.len() as f64;
        if value < self.min || value > max {
            return MASS_FLOOR;
        }
        let idx = (((value - self.min) / self.width) as usize).min(self.mass.len() - 1);
        self.mass[idx].max(MASS_FLOOR)
    }
}

/// Scores a row as −Σ log p over independent per-column histograms
#[derive(Debug, Clone)]
pub struct HbosDetector {
    n_bins: usize,
    histograms: Vec<Histogram>,
    fitted: bool,
}

impl HbosDetector {
    pub fn new(n_bins: usize) -> Self {
        Self {
            n_bins: n_bins.max(1),
            histograms: Vec::new(),
            fitted: false,
        }
    }
}

impl Detector for HbosDetector {
    fn name(&self) -> &'static str {
        "hbos"
    }

    fn fit(&mut self, rows: &[Vec<f64>], labels: Option<&[bool]>) -> Result<(), DetectorError> {
        let reference = reference_rows(rows, labels)?;
        let width = reference[0].len();
        self.histograms = (0..width)
            .map(|j| {
                let column: Vec<f64> = reference.iter().map(|r| r[j]).collect();
                Histogram::fit(&column, self.n_bins)
            })
            .collect();
        self.fitted = true;
        Ok(())
    }

    fn score_samples(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, DetectorError> {
        if !self.fitted {
            return Err(DetectorError::NotFitted(self.name()));
        }
        check_width(rows, self.histograms.len())?;

        Ok(rows
            .iter()
            .map(|row| {
                -row.iter()
                    .zip(&self.histograms)
                    .map(|(&v, h)| h.mass_at(v).ln())
                    .sum::<f64>()
            })
            .collect())
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }
}
