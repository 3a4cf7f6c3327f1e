//! Per-series Buffer Table

use crate::buffer::StreamBuffer;
use signal_window::{ConfigError, Record, SchemaError, SeriesKey, Window, WindowConfig};
use std::collections::HashMap;
use tracing::debug;

/// One buffer per (asset, channel), created lazily on first record.
///
/// Single writer: the owning consumer loop admits records in arrival order.
/// Buffers live for the lifetime of the table; there is no stale-key eviction.
pub struct BufferTable {
    buffers: HashMap<SeriesKey, StreamBuffer>,
    config: WindowConfig,
}

impl BufferTable {
    pub fn new(config: WindowConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            buffers: HashMap::new(),
            config,
        })
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    /// Admit a record; returns the materialised window when this record
    /// lands on the scoring cadence.
    pub fn admit(&mut self, record: &Record) -> Result<Option<Window>, SchemaError> {
        let key = record.key();
        let size = self.config.size;
        let buffer = self.buffers.entry(key.clone()).or_insert_with(|| {
            debug!("Creating stream buffer for {} (capacity {})", key, size);
            StreamBuffer::new(size)
        });

        buffer.push(record);
        if buffer.is_due(self.config.stride) {
            buffer.snapshot(&key).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn get(&self, key: &SeriesKey) -> Option<&StreamBuffer> {
        self.buffers.get(key)
    }

    /// Number of live series
    pub fn key_count(&self) -> usize {
        self.buffers.len()
    }

    /// Drop one series' state
    pub fn remove(&mut self, key: &SeriesKey) -> Option<StreamBuffer> {
        self.buffers.remove(key)
    }

    /// Drop every series' state
    pub fn clear(&mut self) {
        self.buffers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn record(asset: &str, i: i64) -> Record {
        Record::new(asset, "x", Utc.timestamp_millis_opt(i).unwrap(), i as f64)
    }

    #[test]
    fn test_rejects_bad_config() {
        assert!(BufferTable::new(WindowConfig::new(0, 1)).is_err());
        assert!(BufferTable::new(WindowConfig::new(4, 0)).is_err());
    }

    #[test]
    fn test_scoring_cadence_50_25() {
        let mut table = BufferTable::new(WindowConfig::new(50, 25)).unwrap();
        let mut scored_at = Vec::new();
        for i in 1..=1000 {
            if table.admit(&record("a", i)).unwrap().is_some() {
                scored_at.push(i);
            }
        }
        let expected: Vec<i64> = (2..=40).map(|k| k * 25).collect();
        assert_eq!(scored_at[..3], [50, 75, 100]);
        assert_eq!(scored_at, expected);
    }

    #[test]
    fn test_keys_are_independent() {
        let mut table = BufferTable::new(WindowConfig::new(3, 3)).unwrap();
        table.admit(&record("a", 0)).unwrap();
        table.admit(&record("a", 1)).unwrap();
        table.admit(&record("b", 2)).unwrap();
        let window = table.admit(&record("a", 3)).unwrap().unwrap();
        assert_eq!(window.values(), &[0.0, 1.0, 3.0]);
        assert_eq!(table.key_count(), 2);
        assert_eq!(table.get(&SeriesKey::new("b", "x")).unwrap().len(), 1);
    }

    proptest! {
        #[test]
        fn prop_buffer_never_exceeds_window(size in 1usize..64, stride in 1usize..64, n in 0i64..400) {
            let mut table = BufferTable::new(WindowConfig::new(size, stride)).unwrap();
            for i in 0..n {
                if let Some(window) = table.admit(&record("a", i)).unwrap() {
                    prop_assert_eq!(window.len(), size);
                }
                let buffer = table.get(&SeriesKey::new("a", "x")).unwrap();
                prop_assert!(buffer.len() <= size);
            }
        }
    }
}
