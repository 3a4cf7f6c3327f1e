//! Alert Sinks

use crate::alert::Alert;
use crate::ScorerError;
use std::io::{self, Write};
use tokio::sync::mpsc;

/// Destination for emitted alerts
pub trait AlertSink {
    fn emit(&mut self, alert: &Alert) -> Result<(), ScorerError>;

    /// Called once when the stream ends
    fn flush(&mut self) -> Result<(), ScorerError> {
        Ok(())
    }
}

/// One JSON object per line
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonLinesSink<io::Stdout> {
    /// Default sink: standard output
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> AlertSink for JsonLinesSink<W> {
    fn emit(&mut self, alert: &Alert) -> Result<(), ScorerError> {
        serde_json::to_writer(&mut self.writer, alert).map_err(|e| ScorerError::Sink(e.to_string()))?;
        self.writer
            .write_all(b"\n")
            .map_err(|e| ScorerError::Sink(e.to_string()))
    }

    fn flush(&mut self) -> Result<(), ScorerError> {
        self.writer.flush().map_err(|e| ScorerError::Sink(e.to_string()))
    }
}

/// Collects alerts in memory
#[derive(Debug, Default)]
pub struct VecSink {
    pub alerts: Vec<Alert>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AlertSink for VecSink {
    fn emit(&mut self, alert: &Alert) -> Result<(), ScorerError> {
        self.alerts.push(alert.clone());
        Ok(())
    }
}

/// Forwards alerts to an async consumer
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Alert>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<Alert>) -> Self {
        Self { tx }
    }
}

impl AlertSink for ChannelSink {
    fn emit(&mut self, alert: &Alert) -> Result<(), ScorerError> {
        self.tx
            .send(alert.clone())
            .map_err(|_| ScorerError::Sink("alert receiver dropped".to_string()))
    }
}
