//! Bounded Sliding Buffer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use signal_window::{infer_sampling_rate, Record, SchemaError, SeriesKey, Window};
use std::collections::VecDeque;

/// One buffered sample
#[derive(Debug, Clone, PartialEq)]
struct Sample {
    timestamp: DateTime<Utc>,
    value: f64,
    rpm: Option<f64>,
}

/// Fill state of a per-series buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BufferState {
    /// Nothing admitted yet
    Empty,
    /// Fewer samples than the window size
    Filling,
    /// Exactly full, nothing evicted yet
    Ready,
    /// Full, oldest samples are being evicted
    Sliding,
}

/// Fixed-capacity ring over the most recent samples of one series
#[derive(Debug, Clone)]
pub struct StreamBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
    /// Records admitted over the buffer's lifetime
    admitted: u64,
    evicted: bool,
}

impl StreamBuffer {
    /// Create a buffer holding at most `capacity` samples (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            admitted: 0,
            evicted: false,
        }
    }

    /// Admit a record, evicting the oldest sample when at capacity
    pub fn push(&mut self, record: &Record) -> BufferState {
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
            self.evicted = true;
        }
        self.samples.push_back(Sample {
            timestamp: record.timestamp,
            value: record.value,
            rpm: record.rpm,
        });
        self.admitted += 1;
        self.state()
    }

    pub fn state(&self) -> BufferState {
        if self.samples.is_empty() {
            BufferState::Empty
        } else if self.samples.len() < self.capacity {
            BufferState::Filling
        } else if self.evicted {
            BufferState::Sliding
        } else {
            BufferState::Ready
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total records admitted (for scoring cadence)
    pub fn admitted(&self) -> u64 {
        self.admitted
    }

    /// Scoring cadence: full, and the admitted count is a multiple of `stride`
    pub fn is_due(&self, stride: usize) -> bool {
        stride > 0 && self.is_full() && self.admitted % stride as u64 == 0
    }

    /// Materialise the current contents as a window.
    ///
    /// Span is the min/max buffered timestamp; rotational speed is averaged
    /// over the samples that carry it.
    pub fn snapshot(&self, key: &SeriesKey) -> Result<Window, SchemaError> {
        let values: Vec<f64> = self.samples.iter().map(|s| s.value).collect();

        let mut stamps: Vec<DateTime<Utc>> = self.samples.iter().map(|s| s.timestamp).collect();
        stamps.sort();
        let start = stamps.first().copied().unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let end = stamps.last().copied().unwrap_or(start);

        let speeds: Vec<f64> = self.samples.iter().filter_map(|s| s.rpm).collect();
        let rpm = if speeds.is_empty() {
            Vec::new()
        } else {
            vec![speeds.iter().sum::<f64>() / speeds.len() as f64]
        };

        Window::new(
            key.clone(),
            start,
            end,
            values,
            rpm,
            infer_sampling_rate(&stamps),
        )
    }

    /// Drop buffered samples; the admitted counter is kept
    pub fn clear(&mut self) {
        self.samples.clear();
        self.evicted = false;
    }
}
