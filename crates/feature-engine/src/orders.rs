//! Order-tracking Features for Rotating Machinery

use crate::fft::{FftAnalyzer, Taper};
use crate::vector::FeatureVector;
use signal_window::Window;

/// Order-tracking parameters
#[derive(Debug, Clone, PartialEq)]
pub struct OrderParams<'a> {
    /// Harmonic multiples of shaft speed to report
    pub orders: &'a [u32],
    /// Offset either side of the dominant peak for the sideband ratio (Hz)
    pub sideband_offset_hz: f64,
}

/// Order-tracking feature family.
///
/// Order amplitudes are zero-filled when rotational speed is missing or
/// non-positive, or the sampling rate is unknown. The sideband ratio only
/// needs a sampling rate.
pub fn compute_order_features(
    window: &Window,
    params: &OrderParams<'_>,
    fft: &mut FftAnalyzer,
) -> FeatureVector {
    let mut features = FeatureVector::new();
    for order in params.orders {
        features.insert(order_name(*order), 0.0);
    }
    features.insert("order_fundamental_hz", 0.0);
    features.insert("sideband_ratio", 0.0);

    let rate = match window.sampling_rate_hz() {
        Some(rate) if !window.is_empty() => rate,
        _ => return features,
    };

    // Zero-pad to a power of two for finer bin spacing.
    let n_fft = window.len().next_power_of_two();
    let spectrum = fft.spectrum(window.values(), rate, Some(n_fft), Taper::Hann);

    if let Some(fundamental) = median(window.rpm()).map(|rpm| rpm / 60.0) {
        if fundamental > 0.0 {
            features.insert("order_fundamental_hz", fundamental);
            for order in params.orders {
                if let Some(k) = spectrum.nearest_bin(*order as f64 * fundamental) {
                    features.insert(order_name(*order), spectrum.magnitudes[k]);
                }
            }
        }
    }

    if let Some(peak) = spectrum.peak_bin() {
        let carrier = spectrum.magnitudes[peak];
        let peak_freq = spectrum.freqs[peak];
        let lower = spectrum.nearest_bin(peak_freq - params.sideband_offset_hz);
        let upper = spectrum.nearest_bin(peak_freq + params.sideband_offset_hz);
        if let (Some(lower), Some(upper)) = (lower, upper) {
            if carrier > 0.0 {
                let sideband = spectrum.magnitudes[lower] + spectrum.magnitudes[upper];
                features.insert("sideband_ratio", sideband / carrier);
            }
        }
    }

    features
}

fn order_name(order: u32) -> String {
    format!("order_{}x_amplitude", order)
}

fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}
