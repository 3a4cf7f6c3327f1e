//! Frequency Band Scan
//!
//! Buckets windows by their dominant spectral peak and flags bands whose
//! mean peak magnitude stands out from the population, in the manner of a
//! bump hunt.

use feature_engine::FeatureMatrix;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_BANDS: usize = 10;
pub const FREQUENCY_COLUMN: &str = "fft_peak_freq";
pub const MAGNITUDE_COLUMN: &str = "fft_peak_magnitude";

/// One populated frequency band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandScanResult {
    pub band_start: f64,
    pub band_end: f64,
    /// Mean peak magnitude of the windows in the band
    pub score: f64,
    /// 1 − Φ(|z|) of the band score against all windows
    pub p_value: f64,
    pub windows: usize,
}

/// Scan a feature matrix on its peak frequency and magnitude columns.
/// A matrix lacking either column scans as empty.
pub fn scan_frequency_bands(matrix: &FeatureMatrix, n_bands: usize) -> Vec<BandScanResult> {
    match (matrix.column(FREQUENCY_COLUMN), matrix.column(MAGNITUDE_COLUMN)) {
        (Some(frequencies), Some(magnitudes)) => scan_bands(&frequencies, &magnitudes, n_bands),
        _ => {
            debug!("Band scan skipped: no {} / {} columns", FREQUENCY_COLUMN, MAGNITUDE_COLUMN);
            Vec::new()
        }
    }
}

/// Split [min, max] of `frequencies` into `n_bands` equal bands and score
/// each populated band. The top band includes its upper edge. Results are
/// sorted by ascending p-value; empty bands are left out.
pub fn scan_bands(frequencies: &[f64], magnitudes: &[f64], n_bands: usize) -> Vec<BandScanResult> {
    let pairs: Vec<(f64, f64)> = frequencies
        .iter()
        .zip(magnitudes)
        .filter(|(f, m)| f.is_finite() && m.is_finite())
        .map(|(&f, &m)| (f, m))
        .collect();
    if pairs.is_empty() || n_bands == 0 {
        return Vec::new();
    }

    let (lo, hi) = pairs
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(f, _)| (lo.min(f), hi.max(f)));
    let width = (hi - lo) / n_bands as f64;

    let n = pairs.len() as f64;
    let mean = pairs.iter().map(|(_, m)| m).sum::<f64>() / n;
    let std = (pairs.iter().map(|(_, m)| (m - mean).powi(2)).sum::<f64>() / n).sqrt();
    let global_mean = if mean != 0.0 { mean } else { 1e-6 };
    let global_std = if std > 0.0 { std } else { 1.0 };

    let mut sums = vec![0.0; n_bands];
    let mut counts = vec![0usize; n_bands];
    for &(f, m) in &pairs {
        let band = if width > 0.0 {
            (((f - lo) / width) as usize).min(n_bands - 1)
        } else {
            0
        };
        sums[band] += m;
        counts[band] += 1;
    }

    let mut results: Vec<BandScanResult> = (0..n_bands)
        .filter(|&b| counts[b] > 0)
        .map(|b| {
            let score = sums[b] / counts[b] as f64;
            let z = (score - global_mean) / global_std;
            BandScanResult {
                band_start: lo + b as f64 * width,
                band_end: lo + (b + 1) as f64 * width,
                score,
                p_value: (1.0 - normal_cdf(z.abs())).clamp(0.0, 1.0),
                windows: counts[b],
            }
        })
        .collect();
    results.sort_by(|a, b| a.p_value.total_cmp(&b.p_value));
    results
}

/// Standard normal CDF (Abramowitz and Stegun 7.1.26)
fn normal_cdf(x: f64) -> f64 {
    let a1 = 0.254_829_592;
    let a2 = -0.284_496_736;
    let a3 = 1.421_413_741;
    let a4 = -1.453_152_027;
    let a5 = 1.061_405_429;
    let p = 0.327_591_1;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs() / std::f64::consts::SQRT_2;
    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();
    0.5 * (1.0 + sign * y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use feature_engine::{FeatureVector, RowMeta};
    use signal_window::SeriesKey;

    fn matrix(peaks: &[(f64, f64)]) -> FeatureMatrix {
        FeatureMatrix::from_vectors(
            peaks
                .iter()
                .map(|&(freq, magnitude)| {
                    let meta = RowMeta {
                        key: SeriesKey::new("gearbox", "vib"),
                        window_start: DateTime::<Utc>::UNIX_EPOCH,
                        window_end: DateTime::<Utc>::UNIX_EPOCH,
                    };
                    let mut vector = FeatureVector::new();
                    vector.insert(FREQUENCY_COLUMN, freq);
                    vector.insert(MAGNITUDE_COLUMN, magnitude);
                    (meta, vector)
                })
                .collect(),
        )
    }

    #[test]
    fn test_normal_cdf() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-6);
        assert!((normal_cdf(1.96) - 0.975).abs() < 1e-3);
        assert!((normal_cdf(-1.0) - 0.158_655).abs() < 1e-4);
    }

    #[test]
    fn test_empty_input() {
        assert!(scan_frequency_bands(&matrix(&[]), DEFAULT_BANDS).is_empty());
        assert!(scan_bands(&[], &[], DEFAULT_BANDS).is_empty());
        assert!(scan_bands(&[10.0], &[1.0], 0).is_empty());
    }

    #[test]
    fn test_missing_columns() {
        let mut vector = FeatureVector::new();
        vector.insert("rms", 1.0);
        let meta = RowMeta {
            key: SeriesKey::new("gearbox", "vib"),
            window_start: DateTime::<Utc>::UNIX_EPOCH,
            window_end: DateTime::<Utc>::UNIX_EPOCH,
        };
        let only_rms = FeatureMatrix::from_vectors(vec![(meta, vector)]);
        assert!(scan_frequency_bands(&only_rms, DEFAULT_BANDS).is_empty());
    }

    #[test]
    fn test_single_frequency_forms_one_band() {
        let peaks = [(50.0, 1.0), (50.0, 2.0), (50.0, 3.0)];
        let results = scan_frequency_bands(&matrix(&peaks), DEFAULT_BANDS);
        assert_eq!(results.len(), 1);
        let band = &results[0];
        assert_eq!(band.band_start, 50.0);
        assert_eq!(band.band_end, 50.0);
        assert_eq!(band.windows, 3);
        assert!((band.score - 2.0).abs() < 1e-12);
        assert!((band.p_value - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_results_sorted_by_p_value() {
        // quiet windows spread over 10..100 Hz, a loud cluster near 95 Hz
        let mut peaks: Vec<(f64, f64)> = (0..40).map(|i| (10.0 + i as f64 * 2.0, 1.0)).collect();
        peaks.extend([(95.0, 12.0), (97.0, 11.0), (100.0, 13.0)]);
        let results = scan_frequency_bands(&matrix(&peaks), 9);

        assert!(!results.is_empty());
        assert!(results.windows(2).all(|w| w[0].p_value <= w[1].p_value));
        let top = &results[0];
        assert!(top.band_start <= 95.0 && top.band_end >= 100.0);
        assert!(top.p_value < 0.05);
        assert!(results.iter().all(|r| r.windows > 0));
        assert_eq!(results.iter().map(|r| r.windows).sum::<usize>(), peaks.len());
    }
}
