//! Model Selection
//!
//! Evaluates fitted candidates on a labelled holdout split and keeps the one
//! with the best (PR-AUC, ROC-AUC, SIC) tuple. PR-AUC leads because anomalies
//! are rare.

use crate::detector::{Availability, DetectorSpec};
use crate::metrics::{EvaluationMetrics, DEFAULT_TOP_K};
use crate::model::ScoringModel;
use crate::{Detector, SelectionError};
use feature_engine::FeatureMatrix;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::ops::Range;
use tracing::{info, warn};

/// Holdout result for one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    pub metrics: EvaluationMetrics,
}

/// Winning model plus every candidate's metrics, in input order
#[derive(Debug, Clone)]
pub struct Selection {
    pub model: ScoringModel,
    pub index: usize,
    pub candidates: Vec<Candidate>,
}

impl Selection {
    pub fn best(&self) -> &Candidate {
        &self.candidates[self.index]
    }
}

#[derive(Debug, Clone)]
pub struct ModelSelector {
    top_k: usize,
}

impl Default for ModelSelector {
    fn default() -> Self {
        Self { top_k: DEFAULT_TOP_K }
    }
}

impl ModelSelector {
    pub fn new(top_k: usize) -> Self {
        Self { top_k }
    }

    /// Pick the best of already fitted models. Ties keep the earlier
    /// candidate.
    pub fn select(
        &self,
        models: Vec<ScoringModel>,
        holdout: &FeatureMatrix,
        labels: &[bool],
    ) -> Result<Selection, SelectionError> {
        if models.is_empty() {
            return Err(SelectionError::NoCandidates);
        }
        if labels.len() != holdout.len() {
            return Err(SelectionError::LabelMismatch {
                rows: holdout.len(),
                labels: labels.len(),
            });
        }

        let mut candidates = Vec::with_capacity(models.len());
        let mut best: Option<(usize, [f64; 3])> = None;
        for (index, model) in models.iter().enumerate() {
            let scores = model.score_matrix(holdout)?;
            let metrics = EvaluationMetrics::evaluate(&scores, labels, self.top_k)?;
            let key = rank_key(&metrics);
            info!(
                "Candidate {}: pr_auc={:?} roc_auc={:?} sic={:?}",
                model.detector().name(),
                metrics.pr_auc,
                metrics.roc_auc,
                metrics.sic
            );
            if best.map_or(true, |(_, b)| compare(&key, &b) == Ordering::Greater) {
                best = Some((index, key));
            }
            candidates.push(Candidate {
                name: model.detector().name().to_string(),
                metrics,
            });
        }

        let index = best.map(|(i, _)| i).unwrap_or(0);
        let model = models
            .into_iter()
            .nth(index)
            .ok_or(SelectionError::NoCandidates)?;
        info!("Selected {}", candidates[index].name);

        Ok(Selection {
            model,
            index,
            candidates,
        })
    }

    /// Train every available detector spec and select among them.
    /// Unavailable kinds are skipped with a warning.
    pub fn train_and_select(
        &self,
        specs: &[DetectorSpec],
        train: &FeatureMatrix,
        train_labels: Option<&[bool]>,
        holdout: &FeatureMatrix,
        holdout_labels: &[bool],
        calibrate: bool,
    ) -> Result<Selection, SelectionError> {
        let mut models = Vec::with_capacity(specs.len());
        for spec in specs {
            match spec.build() {
                Availability::Available(detector) => {
                    models.push(ScoringModel::fit_detector(detector, train, train_labels, calibrate)?);
                }
                Availability::Unavailable {
                    detector,
                    capability,
                } => warn!("Skipping {}: requires {}", detector, capability),
            }
        }
        self.select(models, holdout, holdout_labels)
    }
}

fn rank_key(metrics: &EvaluationMetrics) -> [f64; 3] {
    [metrics.pr_auc, metrics.roc_auc, metrics.sic].map(|m| m.unwrap_or(f64::NEG_INFINITY))
}

fn compare(a: &[f64; 3], b: &[f64; 3]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| x.partial_cmp(y).unwrap_or(Ordering::Equal))
        .find(|o| *o != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

/// Split `n` time-ordered rows into a leading training range and a trailing
/// holdout range of about `holdout_fraction` of the rows. Each side keeps at
/// least one row when `n >= 2`.
pub fn holdout_split(n: usize, holdout_fraction: f64) -> (Range<usize>, Range<usize>) {
    if n < 2 || !(holdout_fraction > 0.0) {
        return (0..n, n..n);
    }
    let holdout = ((n as f64 * holdout_fraction.min(1.0)).round() as usize).clamp(1, n - 1);
    (0..n - holdout, n - holdout..n)
}
