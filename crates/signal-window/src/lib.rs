//! Signal Windowing
//!
//! Telemetry record schema, the immutable `Window` entity and the batch
//! windowing engine shared by the batch and streaming paths.

mod error;
mod record;
mod window;
mod windowing;

pub use error::{ConfigError, SchemaError, WindowingError};
pub use record::{RawRecord, Record, SeriesKey};
pub use window::{infer_sampling_rate, Window};
pub use windowing::{generate_windows, windows_from_records, WindowConfig, DEFAULT_WINDOW_SIZE};
