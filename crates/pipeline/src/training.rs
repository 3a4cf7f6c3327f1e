//! Batch Training Path
//!
//! Historical records → windows → feature matrix → fitted scoring model.

use crate::settings::PipelineConfig;
use anomaly_engine::{drift, holdout_split, scan_frequency_bands, BandScanResult, ModelSelector, ScoringModel};
use anyhow::{anyhow, bail, Context, Result};
use feature_engine::{FeatureExtractor, FeatureMatrix};
use signal_window::{generate_windows, RawRecord};
use std::io::BufRead;
use std::path::Path;
use tracing::{info, warn};

/// Read a JSON-lines record file. Any unparsable line fails the load.
pub fn read_records(path: &Path) -> Result<Vec<RawRecord>> {
    let file = std::fs::File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
    let mut records = Vec::new();
    for (i, line) in std::io::BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("Cannot read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: not a record", path.display(), i + 1))?;
        records.push(record);
    }
    info!("Read {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Read per-window labels: a JSON array of booleans
pub fn read_labels(path: &Path) -> Result<Vec<bool>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("Cannot open {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{}: expected a JSON array of booleans", path.display()))
}

/// Window and featurise records with the stream's own settings, so live
/// vectors line up with the trained columns.
pub fn build_matrix(config: &PipelineConfig, records: &[RawRecord]) -> Result<FeatureMatrix> {
    let windows = generate_windows(records, &config.stream.window).context("Windowing failed")?;
    if windows.is_empty() {
        bail!(
            "No complete windows of {} samples in {} records",
            config.stream.window.size,
            records.len()
        );
    }
    Ok(FeatureExtractor::new(config.stream.features.clone()).extract_matrix(&windows))
}

/// Fit the scoring model.
///
/// With labels, every available candidate is trained on the leading split
/// and the best on the trailing holdout is kept. Without labels, the first
/// available candidate is trained on everything. The evaluation rows (the
/// holdout, or everything when unlabelled) are then band-scanned.
pub fn train(config: &PipelineConfig, matrix: &FeatureMatrix, labels: Option<&[bool]>) -> Result<ScoringModel> {
    let training = &config.training;
    if training.detectors.is_empty() {
        bail!("No detectors configured");
    }

    match labels {
        Some(labels) => {
            if labels.len() != matrix.len() {
                bail!("{} labels for {} windows", labels.len(), matrix.len());
            }
            let (fit_rows, holdout_rows) = holdout_split(matrix.len(), training.holdout_fraction);
            if holdout_rows.is_empty() {
                bail!("Holdout split is empty; need at least two windows and a positive fraction");
            }
            let fit = matrix.slice(fit_rows.clone());
            let holdout = matrix.slice(holdout_rows.clone());

            let report = drift::assess(&fit, &holdout);
            for (column, psi) in report.drifted(0.25).into_iter().take(5) {
                warn!("Holdout drift on {}: PSI {:.3}", column, psi);
            }

            let selection = ModelSelector::default().train_and_select(
                &training.detectors,
                &fit,
                Some(&labels[fit_rows]),
                &holdout,
                &labels[holdout_rows],
                training.calibrate,
            )?;
            info!(
                "Selected {} (pr_auc={:?}, roc_auc={:?})",
                selection.best().name,
                selection.best().metrics.pr_auc,
                selection.best().metrics.roc_auc
            );
            report_bands(&holdout, training.n_bands);
            Ok(selection.model)
        }
        None => {
            let spec = training
                .detectors
                .iter()
                .find(|spec| match spec.kind.required_capability() {
                    None => true,
                    Some(capability) => {
                        warn!("Skipping {}: requires {}", spec.kind, capability);
                        false
                    }
                })
                .ok_or_else(|| anyhow!("None of the configured detectors is available"))?;
            let model = ScoringModel::train(spec, matrix, None, training.calibrate)?;
            report_bands(matrix, training.n_bands);
            Ok(model)
        }
    }
}

/// Band-scan the peak frequency columns and log the most significant bands
pub fn report_bands(matrix: &FeatureMatrix, n_bands: usize) -> Vec<BandScanResult> {
    if n_bands == 0 {
        return Vec::new();
    }
    let bands = scan_frequency_bands(matrix, n_bands);
    for band in bands.iter().take(3) {
        info!(
            "Band {:.1}-{:.1} Hz: {} windows, mean peak {:.4}, p={:.4}",
            band.band_start, band.band_end, band.windows, band.score, band.p_value
        );
    }
    bands
}
