//! Holdout Evaluation Metrics
//!
//! Ranking metrics for anomaly scores against boolean labels
//! (true = anomalous). Metrics that are undefined for the given labels,
//! such as ROC-AUC on a single class, are `None`.

use crate::DetectorError;
use serde::{Deserialize, Serialize};

/// Thresholds swept for the SIC surrogate
pub const SIC_THRESHOLDS: usize = 50;

/// Default K for top-K precision
pub const DEFAULT_TOP_K: usize = 10;

/// Metrics for one scored holdout set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub roc_auc: Option<f64>,
    pub pr_auc: Option<f64>,
    /// Best signal_eff / √background_eff over the threshold sweep
    pub sic: Option<f64>,
    /// Threshold at which `sic` was reached
    pub sic_threshold: Option<f64>,
    pub top_k_precision: Option<f64>,
    /// Fraction of rows at or above `sic_threshold` (above the 95th
    /// percentile when no SIC threshold exists)
    pub alert_rate: Option<f64>,
}

impl EvaluationMetrics {
    /// Compute every metric; fails only on a length mismatch
    pub fn evaluate(scores: &[f64], labels: &[bool], top_k: usize) -> Result<Self, DetectorError> {
        if scores.len() != labels.len() {
            return Err(DetectorError::LabelMismatch {
                rows: scores.len(),
                labels: labels.len(),
            });
        }

        let sic_point = sic_surrogate(scores, labels);
        let alert_rate = match sic_point {
            Some((_, threshold)) => Some(fraction(scores, |s| s >= threshold)),
            None => quantile(scores, 0.95).map(|q| fraction(scores, |s| s > q)),
        };

        Ok(Self {
            roc_auc: roc_auc(scores, labels),
            pr_auc: pr_auc(scores, labels),
            sic: sic_point.map(|(v, _)| v),
            sic_threshold: sic_point.map(|(_, t)| t),
            top_k_precision: top_k_precision(scores, labels, top_k),
            alert_rate,
        })
    }
}

fn class_counts(labels: &[bool]) -> (usize, usize) {
    let positives = labels.iter().filter(|&&l| l).count();
    (positives, labels.len() - positives)
}

fn fraction(scores: &[f64], pred: impl Fn(f64) -> bool) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().filter(|&&s| pred(s)).count() as f64 / scores.len() as f64
}

/// Linear-interpolated quantile
fn quantile(scores: &[f64], q: f64) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

/// Area under the ROC curve as the Mann-Whitney statistic, ties at midrank
pub fn roc_auc(scores: &[f64], labels: &[bool]) -> Option<f64> {
    let (positives, negatives) = class_counts(labels);
    if positives == 0 || negatives == 0 || scores.len() != labels.len() {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut rank_sum = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // ranks i+1..=j+1 share their mean
        let midrank = (i + j) as f64 / 2.0 + 1.0;
        rank_sum += order[i..=j].iter().filter(|&&k| labels[k]).count() as f64 * midrank;
        i = j + 1;
    }

    let p = positives as f64;
    Some((rank_sum - p * (p + 1.0) / 2.0) / (p * negatives as f64))
}

/// Trapezoidal area under the precision-recall curve. Points are taken at
/// each distinct score threshold, highest first, up to full recall, and the
/// curve is anchored at (recall 0, precision 1).
pub fn pr_auc(scores: &[f64], labels: &[bool]) -> Option<f64> {
    let (positives, _) = class_counts(labels);
    if positives == 0 || scores.len() != labels.len() {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut points = vec![(0.0, 1.0)];
    let (mut tp, mut fp) = (0usize, 0usize);
    let mut i = 0;
    while i < order.len() {
        let threshold = scores[order[i]];
        while i < order.len() && scores[order[i]] == threshold {
            if labels[order[i]] {
                tp += 1;
            } else {
                fp += 1;
            }
            i += 1;
        }
        let recall = tp as f64 / positives as f64;
        let precision = tp as f64 / (tp + fp) as f64;
        points.push((recall, precision));
        if tp == positives {
            break;
        }
    }

    Some(
        points
            .windows(2)
            .map(|w| (w[1].0 - w[0].0) * (w[1].1 + w[0].1) / 2.0)
            .sum(),
    )
}

/// Best signal-over-√background efficiency and its threshold, swept over
/// evenly spaced thresholds between the minimum and maximum score
pub fn sic_surrogate(scores: &[f64], labels: &[bool]) -> Option<(f64, f64)> {
    if scores.is_empty() || scores.len() != labels.len() {
        return None;
    }
    let (positives, negatives) = class_counts(labels);
    if positives == 0 || negatives == 0 {
        return None;
    }

    let min = scores.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let step = (max - min) / (SIC_THRESHOLDS - 1) as f64;

    let mut best: Option<(f64, f64)> = None;
    for t in 0..SIC_THRESHOLDS {
        let threshold = min + step * t as f64;
        let (mut selected, mut signal) = (0usize, 0usize);
        for (&s, &l) in scores.iter().zip(labels) {
            if s >= threshold {
                selected += 1;
                signal += l as usize;
            }
        }
        if selected == 0 {
            continue;
        }
        let signal_eff = signal as f64 / selected as f64;
        let background_eff = 1.0 - signal_eff;
        let sic = if background_eff > 0.0 {
            signal_eff / background_eff.sqrt()
        } else {
            0.0
        };
        if best.map_or(true, |(b, _)| sic > b) {
            best = Some((sic, threshold));
        }
    }
    best
}

/// Share of anomalous labels among the K highest scores
pub fn top_k_precision(scores: &[f64], labels: &[bool], k: usize) -> Option<f64> {
    if scores.is_empty() || k == 0 || scores.len() != labels.len() {
        return None;
    }
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
    let top = &order[..k.min(order.len())];
    Some(top.iter().filter(|&&i| labels[i]).count() as f64 / top.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: Option<f64>, expected: f64) {
        let actual = actual.unwrap();
        assert!((actual - expected).abs() < 1e-9, "{} != {}", actual, expected);
    }

    #[test]
    fn test_roc_auc_perfect_and_inverted() {
        let labels = [false, false, true, true];
        assert_close(roc_auc(&[0.1, 0.2, 0.8, 0.9], &labels), 1.0);
        assert_close(roc_auc(&[0.9, 0.8, 0.2, 0.1], &labels), 0.0);
    }

    #[test]
    fn test_roc_auc_ties_count_half() {
        assert_close(roc_auc(&[0.5, 0.5], &[false, true]), 0.5);
        // sklearn: roc_auc_score([0,0,1,1],[0.1,0.4,0.35,0.8]) == 0.75
        assert_close(roc_auc(&[0.1, 0.4, 0.35, 0.8], &[false, false, true, true]), 0.75);
    }

    #[test]
    fn test_single_class_is_undefined() {
        assert_eq!(roc_auc(&[0.1, 0.2], &[false, false]), None);
        assert_eq!(pr_auc(&[0.1, 0.2], &[false, false]), None);
        assert_eq!(sic_surrogate(&[0.1, 0.2], &[true, true]), None);
    }

    #[test]
    fn test_pr_auc() {
        assert_close(pr_auc(&[0.1, 0.2, 0.8, 0.9], &[false, false, true, true]), 1.0);
        // points (0,1) (0.5,1) (0.5,0.5) (1,0.667)
        let expected = 0.5 + 0.5 * (0.5 + 2.0 / 3.0) / 2.0;
        assert_close(
            pr_auc(&[0.9, 0.8, 0.7, 0.1], &[true, false, true, false]),
            expected,
        );
    }

    #[test]
    fn test_top_k_precision() {
        let scores = [0.9, 0.1, 0.8, 0.7];
        let labels = [true, false, false, true];
        assert_close(top_k_precision(&scores, &labels, 2), 0.5);
        assert_close(top_k_precision(&scores, &labels, 10), 0.5);
        assert_eq!(top_k_precision(&[], &[], 3), None);
    }

    #[test]
    fn test_sic_prefers_pure_selection() {
        let scores: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let labels: Vec<bool> = (0..20).map(|i| i >= 18).collect();
        let (sic, threshold) = sic_surrogate(&scores, &labels).unwrap();
        assert!(sic > 0.0);
        assert!(threshold > 10.0);
    }

    #[test]
    fn test_evaluate_collects_everything() {
        let scores = [0.1, 0.2, 0.3, 0.9];
        let labels = [false, false, false, true];
        let metrics = EvaluationMetrics::evaluate(&scores, &labels, 1).unwrap();
        assert_close(metrics.roc_auc, 1.0);
        assert_close(metrics.pr_auc, 1.0);
        assert_close(metrics.top_k_precision, 1.0);
        assert!(metrics.alert_rate.unwrap() > 0.0);

        assert!(EvaluationMetrics::evaluate(&scores, &labels[..2], 1).is_err());
    }
}
