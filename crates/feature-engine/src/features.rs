//! Feature Vector Assembly

use crate::envelope::compute_envelope_features;
use crate::fft::FftAnalyzer;
use crate::frequency::compute_frequency_features;
use crate::orders::{compute_order_features, OrderParams};
use crate::time::compute_time_features;
use crate::vector::{FeatureMatrix, FeatureVector, RowMeta};
use serde::{Deserialize, Serialize};
use signal_window::Window;
use tracing::{debug, info};

/// Which feature families to compute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureToggles {
    pub time: bool,
    pub frequency: bool,
    pub envelope: bool,
    pub orders: bool,
}

impl Default for FeatureToggles {
    fn default() -> Self {
        Self {
            time: true,
            frequency: true,
            envelope: true,
            orders: true,
        }
    }
}

/// Feature extraction configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Enabled families
    pub toggles: FeatureToggles,
    /// Trailing window (samples) for rolling std / z-score
    pub rolling_window: usize,
    /// Dominant spectral peaks to report
    pub top_k_peaks: usize,
    /// Shaft-speed harmonics to report
    pub orders: Vec<u32>,
    /// Sideband offset around the dominant peak (Hz)
    pub sideband_offset_hz: f64,
    /// Report the envelope spectrum peak frequency
    pub envelope_spectrum: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            toggles: FeatureToggles::default(),
            rolling_window: 10,
            top_k_peaks: 3,
            orders: vec![1, 2, 3],
            sideband_offset_hz: 1.0,
            envelope_spectrum: true,
        }
    }
}

/// Feature extractor that turns windows into feature vectors
pub struct FeatureExtractor {
    config: FeatureConfig,
    fft: FftAnalyzer,
}

impl FeatureExtractor {
    pub fn new(config: FeatureConfig) -> Self {
        Self {
            config,
            fft: FftAnalyzer::new(),
        }
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Compute every enabled family for one window
    pub fn extract(&mut self, window: &Window) -> FeatureVector {
        let toggles = self.config.toggles;
        let mut features = FeatureVector::new();

        if toggles.time {
            features.extend(compute_time_features(window, self.config.rolling_window));
        }
        if toggles.frequency {
            features.extend(compute_frequency_features(
                window,
                self.config.top_k_peaks,
                &mut self.fft,
            ));
        }
        if toggles.envelope {
            features.extend(compute_envelope_features(
                window,
                self.config.envelope_spectrum,
                &mut self.fft,
            ));
        }
        if toggles.orders {
            let params = OrderParams {
                orders: &self.config.orders,
                sideband_offset_hz: self.config.sideband_offset_hz,
            };
            features.extend(compute_order_features(window, &params, &mut self.fft));
        }

        debug!(
            "Extracted {} features for {} [{} .. {}]",
            features.len(),
            window.key(),
            window.start(),
            window.end()
        );
        features
    }

    /// Batch path: one matrix row per window.
    ///
    /// Windows are independent, so callers holding many series may split the
    /// slice by key and run one extractor per worker.
    pub fn extract_matrix(&mut self, windows: &[Window]) -> FeatureMatrix {
        let vectors = windows
            .iter()
            .map(|window| {
                let meta = RowMeta {
                    key: window.key().clone(),
                    window_start: window.start(),
                    window_end: window.end(),
                };
                (meta, self.extract(window))
            })
            .collect();
        let matrix = FeatureMatrix::from_vectors(vectors);
        info!(
            "Feature matrix: {} rows x {} columns",
            matrix.len(),
            matrix.columns().len()
        );
        matrix
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(FeatureConfig::default())
    }
}
