//! Feature Engineering Engine
//!
//! Pure window → feature transforms in four families (time, frequency,
//! envelope, order tracking), assembled into named feature vectors and batch
//! feature matrices.

mod envelope;
mod features;
mod fft;
mod frequency;
mod orders;
mod time;
mod vector;

pub use envelope::compute_envelope_features;
pub use features::{FeatureConfig, FeatureExtractor, FeatureToggles};
pub use fft::{hann, FftAnalyzer, Spectrum, Taper};
pub use frequency::{compute_frequency_features, SpectralFeatures};
pub use orders::{compute_order_features, OrderParams};
pub use time::{compute_time_features, StatisticalFeatures};
pub use vector::{FeatureMatrix, FeatureVector, RowMeta};
