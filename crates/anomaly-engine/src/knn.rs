//! k-Nearest-Neighbour Distance Detector

use crate::detector::{check_width, column_moments, reference_rows, Detector};
use crate::DetectorError;

/// Mean Euclidean distance to the k nearest training rows, after per-column
/// standardisation
#[derive(Debug, Clone)]
pub struct KnnDetector {
    k: usize,
    means: Vec<f64>,
    scales: Vec<f64>,
    reference: Vec<Vec<f64>>,
    fitted: bool,
}

impl KnnDetector {
    pub fn new(k: usize) -> Self {
        Self {
            k: k.max(1),
            means: Vec::new(),
            scales: Vec::new(),
            reference: Vec::new(),
            fitted: false,
        }
    }

    fn standardise(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(x, (m, s))| (x - m) / s)
            .collect()
    }
}

impl Detector for KnnDetector {
    fn name(&self) -> &'static str {
        "knn"
    }

    fn fit(&mut self, rows: &[Vec<f64>], labels: Option<&[bool]>) -> Result<(), DetectorError> {
        let reference = reference_rows(rows, labels)?;
        let (means, scales) = column_moments(&reference);
        self.means = means;
        self.scales = scales;
        self.reference = reference.iter().map(|r| self.standardise(r)).collect();
        self.fitted = true;
        Ok(())
    }

    fn score_samples(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, DetectorError> {
        if !self.fitted {
            return Err(DetectorError::NotFitted(self.name()));
        }
        check_width(rows, self.means.len())?;

        let k = self.k.min(self.reference.len());
        Ok(rows
            .iter()
            .map(|row| {
                let z = self.standardise(row);
                let mut distances: Vec<f64> = self
                    .reference
                    .iter()
                    .map(|r| {
                        r.iter()
                            .zip(&z)
                            .map(|(a, b)| (a - b) * (a - b))
                            .sum::<f64>()
                            .sqrt()
                    })
                    .collect();
                distances.sort_by(|a, b| a.total_cmp(b));
                distances[..k].iter().sum::<f64>() / k as f64
            })
            .collect())
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_far_point_scores_higher() {
        let rows: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64, (i % 3) as f64]).collect();
        let mut detector = KnnDetector::new(3);
        detector.fit(&rows, None).unwrap();
        let scores = detector
            .score_samples(&[vec![10.0, 1.0], vec![60.0, 9.0]])
            .unwrap();
        assert!(scores[1] > scores[0] * 5.0);
    }

    #[test]
    fn test_k_capped_by_reference_size() {
        let mut detector = KnnDetector::new(50);
        detector.fit(&[vec![0.0], vec![1.0]], None).unwrap();
        let scores = detector.score_samples(&[vec![0.5]]).unwrap();
        assert!((scores[0] - 1.0).abs() < 1e-12);
    }
}
