//! Window Entity

use crate::error::SchemaError;
use crate::record::SeriesKey;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Fixed-length, time-ordered sample slice: the unit of feature computation.
///
/// Immutable once built; fields are only reachable through accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Window {
    key: SeriesKey,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    values: Vec<f64>,
    /// Speed readings observed in the window: those carried by its samples
    /// (batch) or one averaged reading (streaming). Not index-aligned with
    /// `values`; consumers reduce it (median) rather than index it.
    rpm: Vec<f64>,
    sampling_rate_hz: Option<f64>,
}

impl Window {
    /// Create a window, rejecting an end that precedes the start
    pub fn new(
        key: SeriesKey,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        values: Vec<f64>,
        rpm: Vec<f64>,
        sampling_rate_hz: Option<f64>,
    ) -> Result<Self, SchemaError> {
        if end < start {
            return Err(SchemaError::InvertedSpan { start, end });
        }
        Ok(Self {
            key,
            start,
            end,
            values,
            rpm,
            sampling_rate_hz: sampling_rate_hz.filter(|r| r.is_finite() && *r > 0.0),
        })
    }

    /// Build a window with evenly spaced timestamps from the Unix epoch.
    /// Used by tests and benches that only care about the samples.
    pub fn from_samples(values: Vec<f64>, sampling_rate_hz: Option<f64>) -> Self {
        let start = DateTime::<Utc>::UNIX_EPOCH;
        let span_secs = match sampling_rate_hz {
            Some(rate) if rate > 0.0 && values.len() > 1 => (values.len() - 1) as f64 / rate,
            _ => 0.0,
        };
        let end = start + Duration::nanoseconds((span_secs * 1e9) as i64);
        Self {
            key: SeriesKey::new("synthetic", "signal"),
            start,
            end,
            values,
            rpm: Vec::new(),
            sampling_rate_hz: sampling_rate_hz.filter(|r| r.is_finite() && *r > 0.0),
        }
    }

    /// Attach rotational-speed context (consumes and returns the window)
    pub fn with_rpm(mut self, rpm: Vec<f64>) -> Self {
        self.rpm = rpm;
        self
    }

    pub fn key(&self) -> &SeriesKey {
        &self.key
    }

    pub fn asset_id(&self) -> &str {
        &self.key.asset_id
    }

    pub fn channel(&self) -> &str {
        &self.key.channel
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Rotational-speed readings, unordered relative to `values`
    pub fn rpm(&self) -> &[f64] {
        &self.rpm
    }

    /// Sampling rate inferred from timestamps, `None` when unknown
    pub fn sampling_rate_hz(&self) -> Option<f64> {
        self.sampling_rate_hz
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Infer sampling rate as the reciprocal of the mean inter-sample delta.
///
/// Expects timestamps in ascending order. Returns `None` for fewer than two
/// samples or a non-positive mean delta.
pub fn infer_sampling_rate<'a, I>(timestamps: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a DateTime<Utc>>,
{
    let mut iter = timestamps.into_iter();
    let mut prev = *iter.next()?;
    let mut total_secs = 0.0;
    let mut deltas = 0usize;
    for ts in iter {
        total_secs += seconds_between(prev, *ts);
        prev = *ts;
        deltas += 1;
    }
    if deltas == 0 {
        return None;
    }
    let mean = total_secs / deltas as f64;
    if mean > 0.0 && mean.is_finite() {
        Some(1.0 / mean)
    } else {
        None
    }
}

fn seconds_between(a: DateTime<Utc>, b: DateTime<Utc>) -> f64 {
    let delta = b - a;
    match delta.num_nanoseconds() {
        Some(ns) => ns as f64 / 1e9,
        None => delta.num_milliseconds() as f64 / 1e3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    #[test]
    fn test_sampling_rate_from_uniform_deltas() {
        let stamps: Vec<_> = (0..10).map(|i| ts(i * 10)).collect();
        let rate = infer_sampling_rate(&stamps).unwrap();
        assert!((rate - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_sampling_rate_undefined() {
        assert_eq!(infer_sampling_rate(&[ts(0)]), None);
        assert_eq!(infer_sampling_rate(&[ts(5), ts(5)]), None);
        assert_eq!(infer_sampling_rate(std::iter::empty()), None);
    }

    #[test]
    fn test_inverted_span_rejected() {
        let result = Window::new(
            SeriesKey::new("a", "b"),
            ts(100),
            ts(0),
            vec![0.0],
            Vec::new(),
            None,
        );
        assert!(matches!(result, Err(SchemaError::InvertedSpan { .. })));
    }

    #[test]
    fn test_from_samples_span() {
        let window = Window::from_samples(vec![0.0; 101], Some(100.0));
        assert_eq!((window.end() - window.start()).num_milliseconds(), 1000);
        assert_eq!(window.len(), 101);
        assert_eq!(window.sampling_rate_hz(), Some(100.0));
    }
}
