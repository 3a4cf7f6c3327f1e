//! Time-domain Features

use crate::vector::FeatureVector;
use signal_window::Window;

/// Variance within rounding of a constant level, relative to mean²
const ZERO_VARIANCE: f64 = 1e-24;

/// Time-domain statistics for one window
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatisticalFeatures {
    /// Mean value
    pub mean: f64,
    /// Standard deviation (population)
    pub std_dev: f64,
    /// Root mean square
    pub rms: f64,
    /// Excess kurtosis (tailedness, 0 for a Gaussian)
    pub kurtosis: f64,
    /// Peak absolute value over RMS
    pub crest_factor: f64,
    /// Max minus min
    pub peak_to_peak: f64,
    /// Mean of the trailing rolling standard deviation
    pub moving_std: f64,
    /// Largest |z| of a sample against its trailing rolling window
    pub rolling_z_score: f64,
    /// Least-squares slope per sample
    pub trend_slope: f64,
    /// Variance left after removing the linear trend
    pub residual_variance: f64,
    /// Mean of the second half minus mean of the first half
    pub seasonal_offset: f64,
}

impl StatisticalFeatures {
    /// Compute statistics from a slice of values.
    ///
    /// Empty input yields all zeros; constant input yields its level
    /// (mean, rms, crest factor) with every spread-based statistic at zero.
    pub fn compute(values: &[f64], rolling_window: usize) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let peak = values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));

        let rms = (values.iter().map(|v| v * v).sum::<f64>() / n).sqrt();
        let crest_factor = if rms > 0.0 { peak / rms } else { 0.0 };

        let mut m2 = 0.0;
        let mut m4 = 0.0;
        for &v in values {
            let d = v - mean;
            m2 += d * d;
            m4 += d * d * d * d;
        }
        let variance = m2 / n;

        let mut stats = Self {
            mean,
            rms,
            crest_factor,
            peak_to_peak: max - min,
            ..Self::default()
        };

        if values.len() < 2 || variance <= ZERO_VARIANCE * mean * mean {
            return stats;
        }

        stats.std_dev = variance.sqrt();
        if values.len() > 3 {
            stats.kurtosis = (m4 / n) / (variance * variance) - 3.0;
        }

        let (moving_std, rolling_z_score) = rolling_stats(values, rolling_window);
        stats.moving_std = moving_std;
        stats.rolling_z_score = rolling_z_score;

        let (slope, residual_variance) = linear_trend(values, mean);
        stats.trend_slope = slope;
        stats.residual_variance = residual_variance;

        let half = values.len() / 2;
        if half > 0 {
            let first = values[..half].iter().sum::<f64>() / half as f64;
            let second = values[half..].iter().sum::<f64>() / (values.len() - half) as f64;
            stats.seasonal_offset = second - first;
        }

        stats
    }

    /// Append as named features
    pub fn append_to(&self, features: &mut FeatureVector) {
        features.insert("mean", self.mean);
        features.insert("std", self.std_dev);
        features.insert("rms", self.rms);
        features.insert("kurtosis", self.kurtosis);
        features.insert("crest_factor", self.crest_factor);
        features.insert("peak_to_peak", self.peak_to_peak);
        features.insert("moving_std", self.moving_std);
        features.insert("rolling_z_score", self.rolling_z_score);
        features.insert("trend_slope", self.trend_slope);
        features.insert("residual_variance", self.residual_variance);
        features.insert("seasonal_offset", self.seasonal_offset);
    }
}

/// Time-domain feature family for a window
pub fn compute_time_features(window: &Window, rolling_window: usize) -> FeatureVector {
    let mut features = FeatureVector::new();
    StatisticalFeatures::compute(window.values(), rolling_window).append_to(&mut features);
    features
}

/// Trailing rolling standard deviation (population, min one sample) averaged
/// over the window, and the largest |z| of each sample against its own
/// trailing window.
fn rolling_stats(values: &[f64], window: usize) -> (f64, f64) {
    let w = window.clamp(1, values.len());
    let mut std_sum = 0.0;
    let mut max_z = 0.0_f64;

    for i in 0..values.len() {
        let lo = (i + 1).saturating_sub(w);
        let slice = &values[lo..=i];
        let k = slice.len() as f64;
        let m = slice.iter().sum::<f64>() / k;
        let var = slice.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / k;
        let sd = var.sqrt();
        std_sum += sd;
        if sd > 0.0 {
            max_z = max_z.max(((values[i] - m) / sd).abs());
        }
    }

    (std_sum / values.len() as f64, max_z)
}

/// Least-squares fit against the sample index: (slope, residual variance)
fn linear_trend(values: &[f64], mean: f64) -> (f64, f64) {
    let n = values.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (i, &v) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        sxy += dx * (v - mean);
        sxx += dx * dx;
    }
    if sxx == 0.0 {
        return (0.0, 0.0);
    }
    let slope = sxy / sxx;
    let intercept = mean - slope * x_mean;
    let residual_variance = values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let r = v - (intercept + slope * i as f64);
            r * r
        })
        .sum::<f64>()
        / n;
    (slope, residual_variance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_computation() {
        let stats = StatisticalFeatures::compute(&[1.0, 2.0, 3.0, 4.0, 5.0], 10);
        assert!((stats.mean - 3.0).abs() < 0.001);
        assert!((stats.peak_to_peak - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_std_dev_computation() {
        let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let stats = StatisticalFeatures::compute(&values, 10);
        assert!((stats.std_dev - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_window_is_guarded() {
        let stats = StatisticalFeatures::compute(&[0.1; 64], 10);
        assert!((stats.crest_factor - 1.0).abs() < 1e-12);
        assert_eq!(stats.kurtosis, 0.0);
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.rolling_z_score, 0.0);
        assert_eq!(stats.trend_slope, 0.0);
        assert!((stats.mean - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_zero_window() {
        let stats = StatisticalFeatures::compute(&[0.0; 16], 10);
        assert_eq!(stats.crest_factor, 0.0);
        assert_eq!(stats.rms, 0.0);
    }

    #[test]
    fn test_single_sample() {
        let stats = StatisticalFeatures::compute(&[-3.0], 10);
        assert_eq!(stats.mean, -3.0);
        assert_eq!(stats.rms, 3.0);
        assert_eq!(stats.crest_factor, 1.0);
        assert_eq!(stats.std_dev, 0.0);
    }

    #[test]
    fn test_empty_values() {
        assert_eq!(StatisticalFeatures::compute(&[], 10), StatisticalFeatures::default());
    }

    #[test]
    fn test_linear_trend() {
        let values: Vec<f64> = (0..50).map(|i| 3.0 + 0.5 * i as f64).collect();
        let stats = StatisticalFeatures::compute(&values, 10);
        assert!((stats.trend_slope - 0.5).abs() < 1e-9);
        assert!(stats.residual_variance < 1e-9);
        assert!(stats.seasonal_offset > 0.0);
    }

    #[test]
    fn test_spike_raises_kurtosis_and_crest() {
        let mut values: Vec<f64> = (0..128).map(|i| (i as f64 * 0.7).sin()).collect();
        let baseline = StatisticalFeatures::compute(&values, 10);
        values[64] = 25.0;
        let spiked = StatisticalFeatures::compute(&values, 10);
        assert!(spiked.kurtosis > baseline.kurtosis + 10.0);
        assert!(spiked.crest_factor > baseline.crest_factor * 3.0);
        assert!(spiked.rolling_z_score > baseline.rolling_z_score);
    }

    #[test]
    fn test_feature_names() {
        let window = Window::from_samples(vec![1.0, 2.0, 3.0, 4.0], Some(10.0));
        let features = compute_time_features(&window, 10);
        assert_eq!(features.len(), 11);
        assert!(features.get("crest_factor").is_some());
    }
}
