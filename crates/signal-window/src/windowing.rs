//! Batch Windowing Engine
//!
//! Groups records by (asset, channel), orders each group by timestamp and
//! slices it into fixed-size strided windows.

use crate::error::{ConfigError, SchemaError, WindowingError};
use crate::record::{RawRecord, Record, SeriesKey};
use crate::window::{infer_sampling_rate, Window};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Default window length in samples
pub const DEFAULT_WINDOW_SIZE: usize = 256;

/// Window geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Samples per window
    pub size: usize,
    /// Samples advanced between consecutive windows
    pub stride: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self::with_size(DEFAULT_WINDOW_SIZE)
    }
}

impl WindowConfig {
    /// Window of `size` samples with the default half-window stride
    pub fn with_size(size: usize) -> Self {
        Self {
            size,
            stride: (size / 2).max(1),
        }
    }

    pub fn new(size: usize, stride: usize) -> Self {
        Self { size, stride }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.size == 0 {
            return Err(ConfigError::InvalidWindowSize(self.size));
        }
        if self.stride == 0 {
            return Err(ConfigError::InvalidStride(self.stride));
        }
        Ok(())
    }

    /// Number of windows a group of `len` samples yields
    pub fn window_count(&self, len: usize) -> usize {
        if self.size == 0 || self.stride == 0 || len < self.size {
            0
        } else {
            (len - self.size) / self.stride + 1
        }
    }
}

/// Slice raw records into windows.
///
/// Configuration is checked first, then every record is validated before any
/// window is produced, so a failure never yields partial output.
pub fn generate_windows(
    records: &[RawRecord],
    config: &WindowConfig,
) -> Result<Vec<Window>, WindowingError> {
    config.validate()?;

    let validated = records
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            Record::try_from(raw.clone()).map_err(|source| WindowingError::Schema { index, source })
        })
        .collect::<Result<Vec<_>, _>>()?;

    windows_from_records(validated, config)
}

/// Slice already-validated records into windows
pub fn windows_from_records(
    records: Vec<Record>,
    config: &WindowConfig,
) -> Result<Vec<Window>, WindowingError> {
    config.validate()?;

    let mut groups: BTreeMap<SeriesKey, Vec<Record>> = BTreeMap::new();
    for record in records {
        groups.entry(record.key()).or_default().push(record);
    }

    let mut windows = Vec::new();
    for (key, mut group) in groups {
        // Stable: equal timestamps keep arrival order.
        group.sort_by_key(|r| r.timestamp);
        let produced = slice_group(&key, &group, config, &mut windows)?;
        debug!("{}: {} samples -> {} windows", key, group.len(), produced);
    }

    info!(
        "Generated {} windows (size={}, stride={})",
        windows.len(),
        config.size,
        config.stride
    );
    Ok(windows)
}

/// Slice one time-sorted group. Each window keeps the speed readings its
/// samples carry; samples without a reading contribute none.
fn slice_group(
    key: &SeriesKey,
    group: &[Record],
    config: &WindowConfig,
    out: &mut Vec<Window>,
) -> Result<usize, SchemaError> {
    let sampling_rate = infer_sampling_rate(group.iter().map(|r| &r.timestamp));
    let count = config.window_count(group.len());

    for k in 0..count {
        let offset = k * config.stride;
        let slice = &group[offset..offset + config.size];
        let values = slice.iter().map(|r| r.value).collect();
        let rpm = slice.iter().filter_map(|r| r.rpm).collect();
        let start = slice[0].timestamp;
        let end = slice[slice.len() - 1].timestamp;
        out.push(Window::new(key.clone(), start, end, values, rpm, sampling_rate)?);
    }
    Ok(count)
}
