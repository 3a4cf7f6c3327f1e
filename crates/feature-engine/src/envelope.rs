//! Envelope / Demodulation Features
//!
//! The envelope (analytic-signal magnitude) isolates amplitude modulation,
//! which is where bearing and gear defects show up before the raw spectrum
//! changes.

use crate::fft::{FftAnalyzer, Taper};
use crate::vector::FeatureVector;
use signal_window::Window;

/// Envelope feature family
pub fn compute_envelope_features(
    window: &Window,
    with_spectrum: bool,
    fft: &mut FftAnalyzer,
) -> FeatureVector {
    let mut features = FeatureVector::new();
    let envelope = fft.analytic_envelope(window.values());

    if envelope.is_empty() {
        features.insert("envelope_mean", 0.0);
        features.insert("envelope_rms", 0.0);
        features.insert("envelope_peak", 0.0);
        features.insert("envelope_kurtosis", 0.0);
        if with_spectrum {
            features.insert("envelope_peak_freq", 0.0);
        }
        return features;
    }

    let n = envelope.len() as f64;
    let mean = envelope.iter().sum::<f64>() / n;
    let rms = (envelope.iter().map(|e| e * e).sum::<f64>() / n).sqrt();
    let peak = envelope.iter().cloned().fold(0.0_f64, f64::max);

    let variance = envelope.iter().map(|e| (e - mean) * (e - mean)).sum::<f64>() / n;
    let kurtosis = if envelope.len() > 3 && variance > 1e-24 * mean * mean {
        let m4 = envelope.iter().map(|e| (e - mean).powi(4)).sum::<f64>() / n;
        m4 / (variance * variance) - 3.0
    } else {
        0.0
    };

    features.insert("envelope_mean", mean);
    features.insert("envelope_rms", rms);
    features.insert("envelope_peak", peak);
    features.insert("envelope_kurtosis", kurtosis);

    if with_spectrum {
        let centred: Vec<f64> = envelope.iter().map(|e| e - mean).collect();
        let rate = window.sampling_rate_hz().unwrap_or(1.0);
        let spectrum = fft.spectrum(&centred, rate, None, Taper::Hann);
        let peak_freq = spectrum
            .peak_bin()
            .filter(|&k| spectrum.magnitudes[k] > 0.0)
            .map(|k| spectrum.freqs[k])
            .unwrap_or(0.0);
        features.insert("envelope_peak_freq", peak_freq);
    }

    features
}
