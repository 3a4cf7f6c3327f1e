//! Frequency-domain Features

use crate::fft::{FftAnalyzer, Spectrum, Taper};
use crate::vector::FeatureVector;
use signal_window::Window;

/// Guard for power-weighted ratios
const EPSILON: f64 = 1e-12;

/// Power spectral summary for one window
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpectralFeatures {
    /// Sum of power over all bins
    pub total_power: f64,
    /// Power-weighted mean frequency
    pub spectral_centroid: f64,
    /// Power in the lowest third of the bins
    pub bandpower_low: f64,
    /// Power in the middle third of the bins
    pub bandpower_mid: f64,
    /// Power in the highest third of the bins
    pub bandpower_high: f64,
    /// Strongest non-DC bin frequency
    pub peak_frequency: f64,
    /// Strongest non-DC bin magnitude
    pub peak_magnitude: f64,
    /// (frequency, magnitude) of the strongest local maxima
    pub dominant: Vec<(f64, f64)>,
}

impl SpectralFeatures {
    /// Summarise a spectrum, keeping up to `top_k` dominant peaks
    pub fn from_spectrum(spectrum: &Spectrum, top_k: usize) -> Self {
        if spectrum.is_empty() {
            return Self::default();
        }

        let power = spectrum.power();
        let total_power: f64 = power.iter().sum();
        let weighted: f64 = power.iter().zip(&spectrum.freqs).map(|(p, f)| p * f).sum();
        let spectral_centroid = if total_power > EPSILON {
            weighted / total_power
        } else {
            0.0
        };

        let [low, mid, high] = split_thirds(power.len());
        let band = |r: std::ops::Range<usize>| power[r].iter().sum::<f64>();

        let (peak_frequency, peak_magnitude) = spectrum
            .peak_bin()
            .filter(|&k| spectrum.magnitudes[k] > 0.0)
            .map(|k| (spectrum.freqs[k], spectrum.magnitudes[k]))
            .unwrap_or((0.0, 0.0));

        let dominant = spectrum
            .local_peaks()
            .into_iter()
            .take(top_k)
            .map(|k| (spectrum.freqs[k], spectrum.magnitudes[k]))
            .collect();

        Self {
            total_power,
            spectral_centroid,
            bandpower_low: band(low),
            bandpower_mid: band(mid),
            bandpower_high: band(high),
            peak_frequency,
            peak_magnitude,
            dominant,
        }
    }

    /// Append as named features; dominant peaks are zero-filled to `top_k`
    pub fn append_to(&self, features: &mut FeatureVector, top_k: usize) {
        features.insert("total_power", self.total_power);
        features.insert("spectral_centroid", self.spectral_centroid);
        features.insert("bandpower_low", self.bandpower_low);
        features.insert("bandpower_mid", self.bandpower_mid);
        features.insert("bandpower_high", self.bandpower_high);
        features.insert("fft_peak_freq", self.peak_frequency);
        features.insert("fft_peak_magnitude", self.peak_magnitude);
        for i in 0..top_k {
            let (freq, mag) = self.dominant.get(i).copied().unwrap_or((0.0, 0.0));
            features.insert(format!("dominant_freq_{}", i + 1), freq);
            features.insert(format!("dominant_mag_{}", i + 1), mag);
        }
    }
}

/// Frequency-domain feature family.
///
/// Uses the window's inferred sampling rate. Without one, the frequency axis
/// falls back to cycles per sample and `sampling_rate_hz` is reported as 0.0
/// so callers can tell the frequency-valued features carry no physical unit.
pub fn compute_frequency_features(
    window: &Window,
    top_k: usize,
    fft: &mut FftAnalyzer,
) -> FeatureVector {
    let mut features = FeatureVector::new();
    features.insert("sampling_rate_hz", window.sampling_rate_hz().unwrap_or(0.0));

    let spectral = if window.len() > 1 {
        let rate = window.sampling_rate_hz().unwrap_or(1.0);
        let spectrum = fft.spectrum(window.values(), rate, None, Taper::Hann);
        SpectralFeatures::from_spectrum(&spectrum, top_k)
    } else {
        SpectralFeatures::default()
    };
    spectral.append_to(&mut features, top_k);
    features
}

/// Three contiguous ranges covering `0..len`, earlier ranges one longer
/// when `len` is not divisible by three
fn split_thirds(len: usize) -> [std::ops::Range<usize>; 3] {
    let base = len / 3;
    let extra = len % 3;
    let a = base + usize::from(extra > 0);
    let b = a + base + usize::from(extra > 1);
    [0..a, a..b, b..len]
}
