//! Telemetry Record Validation

use crate::error::SchemaError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Record as delivered by an ingestion adapter, before validation.
///
/// Every field is optional here so a malformed record can be rejected with
/// the name of the field that is missing instead of a generic parse error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub asset_id: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub rpm: Option<f64>,
}

/// Validated telemetry sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub asset_id: String,
    pub channel: String,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    /// Rotational speed at sample time (revolutions per minute)
    pub rpm: Option<f64>,
}

impl Record {
    /// Create a record with no rotational speed
    pub fn new(
        asset_id: impl Into<String>,
        channel: impl Into<String>,
        timestamp: DateTime<Utc>,
        value: f64,
    ) -> Self {
        Self {
            asset_id: asset_id.into(),
            channel: channel.into(),
            timestamp,
            value,
            rpm: None,
        }
    }

    /// Attach a rotational speed reading
    pub fn with_rpm(mut self, rpm: f64) -> Self {
        self.rpm = Some(rpm);
        self
    }

    /// Series key this record belongs to
    pub fn key(&self) -> SeriesKey {
        SeriesKey::new(self.asset_id.clone(), self.channel.clone())
    }
}

impl TryFrom<RawRecord> for Record {
    type Error = SchemaError;

    fn try_from(raw: RawRecord) -> Result<Self, Self::Error> {
        let asset_id = raw.asset_id.ok_or(SchemaError::MissingField("asset_id"))?;
        let channel = raw.channel.ok_or(SchemaError::MissingField("channel"))?;
        let timestamp = raw.timestamp.ok_or(SchemaError::MissingField("timestamp"))?;
        let value = raw.value.ok_or(SchemaError::MissingField("value"))?;
        if !value.is_finite() {
            return Err(SchemaError::NonFiniteValue {
                field: "value",
                value,
            });
        }

        // Gaps in the speed channel are routine; treat them as absent.
        let rpm = match raw.rpm {
            Some(rpm) if rpm.is_finite() => Some(rpm),
            Some(rpm) => {
                debug!("Dropping non-finite rpm {} for {}::{}", rpm, asset_id, channel);
                None
            }
            None => None,
        };

        Ok(Self {
            asset_id,
            channel,
            timestamp,
            value,
            rpm,
        })
    }
}

impl From<Record> for RawRecord {
    fn from(record: Record) -> Self {
        Self {
            asset_id: Some(record.asset_id),
            channel: Some(record.channel),
            timestamp: Some(record.timestamp),
            value: Some(record.value),
            rpm: record.rpm,
        }
    }
}

/// (asset, channel) pair identifying one independent signal
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SeriesKey {
    pub asset_id: String,
    pub channel: String,
}

impl SeriesKey {
    pub fn new(asset_id: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            asset_id: asset_id.into(),
            channel: channel.into(),
        }
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.asset_id, self.channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn complete() -> RawRecord {
        RawRecord {
            asset_id: Some("pump-1".to_string()),
            channel: Some("accel_x".to_string()),
            timestamp: Some(Utc.timestamp_opt(1_700_000_000, 0).unwrap()),
            value: Some(0.5),
            rpm: Some(1800.0),
        }
    }

    #[test]
    fn test_valid_record() {
        let record = Record::try_from(complete()).unwrap();
        assert_eq!(record.asset_id, "pump-1");
        assert_eq!(record.rpm, Some(1800.0));
        assert_eq!(record.key().to_string(), "pump-1::accel_x");
    }

    #[test]
    fn test_missing_fields_are_named() {
        let raw = RawRecord {
            channel: None,
            ..complete()
        };
        assert_eq!(
            Record::try_from(raw),
            Err(SchemaError::MissingField("channel"))
        );

        let raw = RawRecord {
            value: None,
            ..complete()
        };
        assert_eq!(Record::try_from(raw), Err(SchemaError::MissingField("value")));
    }

    #[test]
    fn test_non_finite_value_rejected() {
        let raw = RawRecord {
            value: Some(f64::NAN),
            ..complete()
        };
        assert!(matches!(
            Record::try_from(raw),
            Err(SchemaError::NonFiniteValue { field: "value", .. })
        ));
    }

    #[test]
    fn test_non_finite_rpm_dropped() {
        let raw = RawRecord {
            rpm: Some(f64::INFINITY),
            ..complete()
        };
        assert_eq!(Record::try_from(raw).unwrap().rpm, None);
    }

    #[test]
    fn test_deserialize_json_line() {
        let line = r#"{"asset_id":"fan","channel":"v","timestamp":"2024-01-01T00:00:00Z","value":1.25}"#;
        let raw: RawRecord = serde_json::from_str(line).unwrap();
        let record = Record::try_from(raw).unwrap();
        assert_eq!(record.value, 1.25);
        assert!(record.rpm.is_none());
    }
}
