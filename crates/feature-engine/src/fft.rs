//! FFT-based Spectral Analysis

use rustfft::{num_complex::Complex, FftPlanner};

/// One-sided magnitude spectrum of a real signal
#[derive(Debug, Clone, Default)]
pub struct Spectrum {
    /// Bin centre frequencies (Hz, or cycles/sample at unit rate)
    pub freqs: Vec<f64>,
    /// |X[k]| for each bin
    pub magnitudes: Vec<f64>,
    /// Number of samples the power is normalised by
    pub n_samples: usize,
}

impl Spectrum {
    pub fn is_empty(&self) -> bool {
        self.magnitudes.is_empty()
    }

    /// Power per bin, |X[k]|² / n
    pub fn power(&self) -> Vec<f64> {
        let n = self.n_samples.max(1) as f64;
        self.magnitudes.iter().map(|m| m * m / n).collect()
    }

    /// Spacing between adjacent bins
    pub fn resolution(&self) -> f64 {
        if self.freqs.len() > 1 {
            self.freqs[1] - self.freqs[0]
        } else {
            0.0
        }
    }

    /// Index of the bin closest to `freq`
    pub fn nearest_bin(&self, freq: f64) -> Option<usize> {
        self.freqs
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| (*a - freq).abs().total_cmp(&(*b - freq).abs()))
            .map(|(i, _)| i)
    }

    /// Largest-magnitude bin, ignoring DC when any other bin exists
    pub fn peak_bin(&self) -> Option<usize> {
        let skip = usize::from(self.magnitudes.len() > 1);
        self.magnitudes
            .iter()
            .enumerate()
            .skip(skip)
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(i, _)| i)
    }

    /// Local maxima (excluding DC), strongest first
    pub fn local_peaks(&self) -> Vec<usize> {
        let m = &self.magnitudes;
        let mut peaks: Vec<usize> = (1..m.len())
            .filter(|&k| {
                let left = m[k - 1];
                let right = m.get(k + 1).copied().unwrap_or(f64::NEG_INFINITY);
                m[k] > left && m[k] >= right
            })
            .collect();
        peaks.sort_by(|&a, &b| m[b].total_cmp(&m[a]).then(a.cmp(&b)));
        peaks
    }
}

/// Taper applied before the transform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Taper {
    Rectangular,
    Hann,
}

/// FFT analyzer; caches plans across calls
pub struct FftAnalyzer {
    planner: FftPlanner<f64>,
}

impl Default for FftAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl FftAnalyzer {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
        }
    }

    /// One-sided spectrum of `signal`, zero-padded to `n_fft` when given.
    pub fn spectrum(
        &mut self,
        signal: &[f64],
        sample_rate: f64,
        n_fft: Option<usize>,
        taper: Taper,
    ) -> Spectrum {
        let n = signal.len();
        if n == 0 {
            return Spectrum::default();
        }
        let n_fft = n_fft.unwrap_or(n).max(n);

        let weights = match taper {
            Taper::Hann => hann(n),
            Taper::Rectangular => vec![1.0; n],
        };
        let mut buffer: Vec<Complex<f64>> = signal
            .iter()
            .zip(&weights)
            .map(|(&v, &w)| Complex::new(v * w, 0.0))
            .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
            .take(n_fft)
            .collect();

        let fft = self.planner.plan_fft_forward(n_fft);
        fft.process(&mut buffer);

        let bins = n_fft / 2 + 1;
        let resolution = sample_rate / n_fft as f64;
        Spectrum {
            freqs: (0..bins).map(|k| k as f64 * resolution).collect(),
            magnitudes: buffer.iter().take(bins).map(|c| c.norm()).collect(),
            n_samples: n,
        }
    }

    /// Magnitude of the analytic signal (Hilbert envelope).
    ///
    /// Built in the frequency domain: keep DC (and Nyquist for even lengths),
    /// double the positive frequencies, zero the negative ones, invert.
    pub fn analytic_envelope(&mut self, signal: &[f64]) -> Vec<f64> {
        let n = signal.len();
        if n == 0 {
            return Vec::new();
        }

        let mut buffer: Vec<Complex<f64>> =
            signal.iter().map(|&v| Complex::new(v, 0.0)).collect();
        self.planner.plan_fft_forward(n).process(&mut buffer);

        for (k, bin) in buffer.iter_mut().enumerate() {
            let h = if k == 0 || (n % 2 == 0 && k == n / 2) {
                1.0
            } else if k < (n + 1) / 2 {
                2.0
            } else {
                0.0
            };
            *bin *= h;
        }

        self.planner.plan_fft_inverse(n).process(&mut buffer);
        // rustfft does not normalise the inverse
        buffer.iter().map(|c| c.norm() / n as f64).collect()
    }
}

/// Symmetric Hann window
pub fn hann(n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => (0..n)
            .map(|i| {
                0.5 - 0.5 * (2.0 * std::f64::consts::PI * i as f64 / (n - 1) as f64).cos()
            })
            .collect(),
    }
}
