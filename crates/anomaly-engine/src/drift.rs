//! Feature Drift
//!
//! Compares a reference feature matrix (typically the training set) with a
//! current one, column by column.

use feature_engine::FeatureMatrix;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Columns with fewer rows than this on either side are skipped
pub const MIN_ROWS: usize = 5;
const PSI_BINS: usize = 10;
const KL_BINS: usize = 20;
/// Proportion floor for empty bins
const BIN_FLOOR: f64 = 1e-6;
/// Column the rotational-speed shift is derived from
const FUNDAMENTAL_COLUMN: &str = "order_fundamental_hz";

/// Per-column drift statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriftReport {
    /// Population stability index per column
    pub psi: BTreeMap<String, f64>,
    /// KL(reference ‖ current) per column
    pub kl_divergence: BTreeMap<String, f64>,
    /// |Δ median RPM| between the two sets, when both carry speed
    pub rpm_shift: Option<f64>,
}

impl DriftReport {
    /// Columns whose PSI exceeds `threshold`, most drifted first
    pub fn drifted(&self, threshold: f64) -> Vec<(&str, f64)> {
        let mut out: Vec<(&str, f64)> = self
            .psi
            .iter()
            .filter(|(_, &v)| v > threshold)
            .map(|(k, &v)| (k.as_str(), v))
            .collect();
        out.sort_by(|a, b| b.1.total_cmp(&a.1));
        out
    }
}

/// Drift over every column present in both matrices
pub fn assess(reference: &FeatureMatrix, current: &FeatureMatrix) -> DriftReport {
    let mut report = DriftReport::default();
    if reference.len() < MIN_ROWS || current.len() < MIN_ROWS {
        debug!(
            "Drift skipped: {} reference rows, {} current rows",
            reference.len(),
            current.len()
        );
    } else {
        for name in reference.columns() {
            let (Some(ref_values), Some(cur_values)) = (reference.column(name), current.column(name))
            else {
                continue;
            };
            report
                .psi
                .insert(name.clone(), population_stability_index(&ref_values, &cur_values, PSI_BINS));
            report
                .kl_divergence
                .insert(name.clone(), kl_divergence(&ref_values, &cur_values, KL_BINS));
        }
    }

    report.rpm_shift = match (median_rpm(reference), median_rpm(current)) {
        (Some(a), Some(b)) => Some((a - b).abs()),
        _ => None,
    };
    report
}

/// Bin proportions of both samples over their shared range, floored
fn shared_histograms(reference: &[f64], current: &[f64], bins: usize) -> Option<(Vec<f64>, Vec<f64>)> {
    let lower = reference
        .iter()
        .chain(current)
        .cloned()
        .fold(f64::INFINITY, f64::min);
    let upper = reference
        .iter()
        .chain(current)
        .cloned()
        .fold(f64::NEG_INFINITY, f64::max);
    if !(upper > lower) {
        return None;
    }

    let width = (upper - lower) / bins as f64;
    let proportions = |values: &[f64]| {
        let mut counts = vec![0usize; bins];
        for &v in values {
            counts[(((v - lower) / width) as usize).min(bins - 1)] += 1;
        }
        counts
            .iter()
            .map(|&c| (c as f64 / values.len() as f64).max(BIN_FLOOR))
            .collect::<Vec<f64>>()
    };
    Some((proportions(reference), proportions(current)))
}

/// Σ (cur − ref) · ln(cur / ref); 0 when both samples are one constant
pub fn population_stability_index(reference: &[f64], current: &[f64], bins: usize) -> f64 {
    match shared_histograms(reference, current, bins.max(1)) {
        Some((r, c)) => r
            .iter()
            .zip(&c)
            .map(|(r, c)| (c - r) * (c / r).ln())
            .sum::<f64>()
            .abs(),
        None => 0.0,
    }
}

/// KL(reference ‖ current) over shared-range histograms, renormalised after
/// flooring
pub fn kl_divergence(reference: &[f64], current: &[f64], bins: usize) -> f64 {
    match shared_histograms(reference, current, bins.max(1)) {
        Some((r, c)) => {
            let (rs, cs) = (r.iter().sum::<f64>(), c.iter().sum::<f64>());
            r.iter()
                .zip(&c)
                .map(|(r, c)| {
                    let (p, q) = (r / rs, c / cs);
                    p * (p / q).ln()
                })
                .sum::<f64>()
                .max(0.0)
        }
        None => 0.0,
    }
}

/// Median RPM over rows with a known fundamental frequency
fn median_rpm(matrix: &FeatureMatrix) -> Option<f64> {
    let mut rpm: Vec<f64> = matrix
        .column(FUNDAMENTAL_COLUMN)?
        .into_iter()
        .filter(|&hz| hz > 0.0)
        .map(|hz| hz * 60.0)
        .collect();
    if rpm.is_empty() {
        return None;
    }
    rpm.sort_by(|a, b| a.total_cmp(b));
    let mid = rpm.len() / 2;
    Some(if rpm.len() % 2 == 0 {
        (rpm[mid - 1] + rpm[mid]) / 2.0
    } else {
        rpm[mid]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use feature_engine::{FeatureVector, RowMeta};
    use signal_window::SeriesKey;

    fn matrix(rms: &[f64], fundamental_hz: f64) -> FeatureMatrix {
        FeatureMatrix::from_vectors(
            rms.iter()
                .map(|&v| {
                    let meta = RowMeta {
                        key: SeriesKey::new("motor", "vib"),
                        window_start: DateTime::<Utc>::UNIX_EPOCH,
                        window_end: DateTime::<Utc>::UNIX_EPOCH,
                    };
                    let mut vector = FeatureVector::new();
                    vector.insert("rms", v);
                    vector.insert(FUNDAMENTAL_COLUMN, fundamental_hz);
                    (meta, vector)
                })
                .collect(),
        )
    }

    #[test]
    fn test_identical_sets_do_not_drift() {
        let values: Vec<f64> = (0..50).map(|i| (i % 10) as f64).collect();
        let report = assess(&matrix(&values, 25.0), &matrix(&values, 25.0));
        assert!(report.psi["rms"].abs() < 1e-12);
        assert!(report.kl_divergence["rms"].abs() < 1e-12);
        assert_eq!(report.rpm_shift, Some(0.0));
        assert!(report.drifted(0.1).is_empty());
    }

    #[test]
    fn test_shifted_set_drifts() {
        let reference: Vec<f64> = (0..50).map(|i| (i % 10) as f64).collect();
        let current: Vec<f64> = reference.iter().map(|v| v + 20.0).collect();
        let report = assess(&matrix(&reference, 25.0), &matrix(&current, 30.0));
        assert!(report.psi["rms"] > 1.0);
        assert!(report.kl_divergence["rms"] > 1.0);
        assert_eq!(report.rpm_shift, Some(300.0));
        let drifted: Vec<&str> = report.drifted(0.2).into_iter().map(|(name, _)| name).collect();
        assert!(drifted.contains(&"rms"));
        assert!(drifted.contains(&FUNDAMENTAL_COLUMN));
    }

    #[test]
    fn test_short_sets_skipped() {
        let report = assess(&matrix(&[1.0, 2.0], 0.0), &matrix(&[1.0; 10], 0.0));
        assert!(report.psi.is_empty());
        assert_eq!(report.rpm_shift, None);
    }

    #[test]
    fn test_constant_columns() {
        assert_eq!(population_stability_index(&[2.0; 6], &[2.0; 6], 10), 0.0);
        assert_eq!(kl_divergence(&[2.0; 6], &[2.0; 6], 10), 0.0);
    }
}
