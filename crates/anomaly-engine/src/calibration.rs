//! Score Calibration
//!
//! Maps raw detector scores onto [0, 1] with parameters fixed at fit time.
//! Transforms never re-normalise against the batch they are given, so the
//! same raw score always maps to the same calibrated score.

use crate::DetectorError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Penalty on the logistic slope; keeps separable data from diverging
const SLOPE_PENALTY: f64 = 1.0;
const NEWTON_ITERATIONS: usize = 50;
const NEWTON_TOLERANCE: f64 = 1e-10;
/// Logistic inverse is evaluated inside (EPS, 1 - EPS)
const PROB_EPS: f64 = 1e-12;

/// Persisted calibration parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum CalibrationModel {
    /// Linear map of the fitting range onto [0, 1], clamped outside it
    MinMax { min: f64, max: f64 },
    /// Platt scaling on standardised scores:
    /// p = σ(slope · (s − center) / scale + intercept)
    Logistic {
        slope: f64,
        intercept: f64,
        center: f64,
        scale: f64,
    },
}

impl CalibrationModel {
    /// Fit on raw scores. With labels (true = anomalous) containing both
    /// classes a logistic map is fitted, otherwise min-max.
    pub fn fit(scores: &[f64], labels: Option<&[bool]>) -> Result<Self, DetectorError> {
        if let Some(labels) = labels {
            if labels.len() != scores.len() {
                return Err(DetectorError::LabelMismatch {
                    rows: scores.len(),
                    labels: labels.len(),
                });
            }
        }

        let pairs: Vec<(f64, Option<bool>)> = scores
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_finite())
            .map(|(i, &s)| (s, labels.map(|l| l[i])))
            .collect();
        if pairs.is_empty() {
            return Err(DetectorError::EmptyScores);
        }

        let finite: Vec<f64> = pairs.iter().map(|(s, _)| *s).collect();
        let targets: Option<Vec<bool>> = pairs.iter().map(|(_, l)| *l).collect();

        match targets {
            Some(targets) if targets.iter().any(|&t| t) && targets.iter().any(|&t| !t) => {
                Ok(Self::fit_logistic(&finite, &targets))
            }
            Some(_) => {
                warn!("Calibration labels contain a single class, using min-max");
                Ok(Self::fit_min_max(&finite))
            }
            None => Ok(Self::fit_min_max(&finite)),
        }
    }

    fn fit_min_max(scores: &[f64]) -> Self {
        let min = scores.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        debug!("Min-max calibration over [{}, {}]", min, max);
        CalibrationModel::MinMax { min, max }
    }

    fn fit_logistic(scores: &[f64], labels: &[bool]) -> Self {
        let n = scores.len() as f64;
        let center = scores.iter().sum::<f64>() / n;
        let var = scores.iter().map(|s| (s - center).powi(2)).sum::<f64>() / n;
        let scale = if var.sqrt() > 1e-12 { var.sqrt() } else { 1.0 };
        let xs: Vec<f64> = scores.iter().map(|s| (s - center) / scale).collect();

        // Platt's smoothed targets
        let positives = labels.iter().filter(|&&l| l).count() as f64;
        let negatives = n - positives;
        let hi = (positives + 1.0) / (positives + 2.0);
        let lo = 1.0 / (negatives + 2.0);
        let ys: Vec<f64> = labels.iter().map(|&l| if l { hi } else { lo }).collect();

        let (mut a, mut b) = (0.0_f64, 0.0_f64);
        for iteration in 0..NEWTON_ITERATIONS {
            let (mut ga, mut gb) = (SLOPE_PENALTY * a, 0.0);
            let (mut haa, mut hab, mut hbb) = (SLOPE_PENALTY, 0.0, 0.0);
            for (&x, &y) in xs.iter().zip(&ys) {
                let p = sigmoid(a * x + b);
                let w = p * (1.0 - p);
                ga += (p - y) * x;
                gb += p - y;
                haa += w * x * x;
                hab += w * x;
                hbb += w;
            }
            let det = haa * hbb - hab * hab;
            if det.abs() < 1e-15 {
                break;
            }
            let da = (hbb * ga - hab * gb) / det;
            let db = (haa * gb - hab * ga) / det;
            a -= da;
            b -= db;
            if da.abs().max(db.abs()) < NEWTON_TOLERANCE {
                debug!("Logistic calibration converged after {} steps", iteration + 1);
                break;
            }
        }

        CalibrationModel::Logistic {
            slope: a,
            intercept: b,
            center,
            scale,
        }
    }

    /// Calibrated score in [0, 1]; NaN maps to 0
    pub fn transform_one(&self, score: f64) -> f64 {
        if score.is_nan() {
            return 0.0;
        }
        match *self {
            CalibrationModel::MinMax { min, max } => {
                if max > min {
                    ((score - min) / (max - min)).clamp(0.0, 1.0)
                } else if score > min {
                    1.0
                } else {
                    0.0
                }
            }
            CalibrationModel::Logistic {
                slope,
                intercept,
                center,
                scale,
            } => sigmoid(slope * (score - center) / scale + intercept),
        }
    }

    pub fn transform(&self, scores: &[f64]) -> Vec<f64> {
        scores.iter().map(|&s| self.transform_one(s)).collect()
    }

    /// Raw score that calibrates to `p`. Exact inside the invertible range:
    /// (0, 1) for logistic, [0, 1] for a non-degenerate min-max.
    pub fn inverse(&self, p: f64) -> f64 {
        match *self {
            CalibrationModel::MinMax { min, max } => min + p.clamp(0.0, 1.0) * (max - min),
            CalibrationModel::Logistic {
                slope,
                intercept,
                center,
                scale,
            } => {
                if slope == 0.0 {
                    return center;
                }
                let p = p.clamp(PROB_EPS, 1.0 - PROB_EPS);
                let logit = (p / (1.0 - p)).ln();
                center + scale * (logit - intercept) / slope
            }
        }
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
