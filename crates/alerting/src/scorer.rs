//! Stream Scorer Implementation

use crate::alert::Alert;
use crate::config::StreamConfig;
use crate::sink::AlertSink;
use crate::ScorerError;
use anomaly_engine::{Detector, DetectorError, ScoringModel};
use feature_engine::FeatureExtractor;
use ring_buffer::BufferTable;
use signal_window::{RawRecord, Record, Window};
use std::future::Future;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Counters for one scorer's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub admitted: u64,
    pub rejected: u64,
    pub windows_scored: u64,
    pub alerts: u64,
}

/// Single-consumer scorer: owns the buffer table, so records for a key are
/// always handled in arrival order.
pub struct StreamScorer {
    config: StreamConfig,
    model: ScoringModel,
    extractor: FeatureExtractor,
    buffers: BufferTable,
    stats: StreamStats,
    key_limit_warned: bool,
}

impl StreamScorer {
    /// Fails up front on invalid configuration or an unfitted model
    pub fn new(config: StreamConfig, model: ScoringModel) -> Result<Self, ScorerError> {
        config.validate()?;
        if !model.is_fitted() {
            return Err(DetectorError::NotFitted(model.detector().name()).into());
        }
        let buffers = BufferTable::new(config.window)?;
        info!(
            "Stream scorer ready: window={} stride={} threshold={} detector={} ({} columns)",
            config.window.size,
            config.window.stride,
            config.threshold,
            model.detector().name(),
            model.columns().len()
        );
        Ok(Self {
            extractor: FeatureExtractor::new(config.features.clone()),
            config,
            model,
            buffers,
            stats: StreamStats::default(),
            key_limit_warned: false,
        })
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn stats(&self) -> StreamStats {
        self.stats
    }

    pub fn buffers(&self) -> &BufferTable {
        &self.buffers
    }

    /// Admit one record. Returns an alert when this record triggers a
    /// scoring pass whose score meets the threshold.
    pub fn process(&mut self, raw: RawRecord) -> Result<Option<Alert>, ScorerError> {
        let record = match Record::try_from(raw) {
            Ok(record) => record,
            Err(e) => {
                self.stats.rejected += 1;
                metrics::counter!("esi_records_rejected_total").increment(1);
                return Err(e.into());
            }
        };
        self.process_record(&record)
    }

    /// Admit an already validated record
    pub fn process_record(&mut self, record: &Record) -> Result<Option<Alert>, ScorerError> {
        let window = self.buffers.admit(record)?;
        self.stats.admitted += 1;
        metrics::counter!("esi_records_admitted_total").increment(1);
        self.check_key_limit();

        match window {
            Some(window) => self.score_window(&window),
            None => Ok(None),
        }
    }

    fn check_key_limit(&mut self) {
        let keys = self.buffers.key_count();
        if !self.key_limit_warned && keys > self.config.max_keys {
            warn!(
                "Live series count {} exceeds soft limit {}; buffers are never evicted",
                keys, self.config.max_keys
            );
            self.key_limit_warned = true;
        }
    }

    fn score_window(&mut self, window: &Window) -> Result<Option<Alert>, ScorerError> {
        let features = self.extractor.extract(window);
        let score = self.model.score_vector(&features)?;
        self.stats.windows_scored += 1;
        metrics::counter!("esi_windows_scored_total").increment(1);
        debug!("Scored {} [{} .. {}]: {:.4}", window.key(), window.start(), window.end(), score);

        if score >= self.config.threshold {
            self.stats.alerts += 1;
            metrics::counter!("esi_alerts_emitted_total").increment(1);
            info!("Alert for {}: score {:.4} >= {}", window.key(), score, self.config.threshold);
            Ok(Some(Alert::new(window, score, features)))
        } else {
            Ok(None)
        }
    }

    /// Consume records until the channel closes
    pub async fn run<S: AlertSink>(
        &mut self,
        rx: mpsc::Receiver<RawRecord>,
        sink: &mut S,
    ) -> Result<StreamStats, ScorerError> {
        self.run_until(rx, sink, std::future::pending::<()>()).await
    }

    /// Consume records until the channel closes or `shutdown` resolves.
    ///
    /// Malformed records are logged and skipped. Detector and sink failures
    /// stop the loop. On shutdown, buffered samples that have not been scored
    /// are discarded; alerts already emitted stand.
    pub async fn run_until<S, F>(
        &mut self,
        mut rx: mpsc::Receiver<RawRecord>,
        sink: &mut S,
        shutdown: F,
    ) -> Result<StreamStats, ScorerError>
    where
        S: AlertSink,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!("Starting stream scoring loop");

        loop {
            let raw = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested, discarding {} buffered series", self.buffers.key_count());
                    self.buffers.clear();
                    break;
                }
                next = rx.recv() => match next {
                    Some(raw) => raw,
                    None => {
                        info!("Input closed");
                        break;
                    }
                },
            };

            match self.process(raw) {
                Ok(Some(alert)) => sink.emit(&alert)?,
                Ok(None) => {}
                Err(ScorerError::Schema(e)) => warn!("Skipping malformed record: {}", e),
                Err(e) => {
                    error!("Stream scoring aborted: {}", e);
                    return Err(e);
                }
            }
        }

        sink.flush()?;
        info!(
            "Stream scoring stopped: {} admitted, {} rejected, {} windows scored, {} alerts",
            self.stats.admitted, self.stats.rejected, self.stats.windows_scored, self.stats.alerts
        );
        Ok(self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::VecSink;
    use anomaly_engine::{DetectorKind, DetectorSpec};
    use chrono::{Duration, TimeZone, Utc};
    use feature_engine::{FeatureConfig, FeatureToggles, FeatureVector};
    use signal_window::{SchemaError, WindowConfig};

    fn time_only() -> FeatureConfig {
        FeatureConfig {
            toggles: FeatureToggles {
                time: true,
                frequency: false,
                envelope: false,
                orders: false,
            },
            ..Default::default()
        }
    }

    fn config(size: usize, stride: usize, threshold: f64) -> StreamConfig {
        StreamConfig {
            window: WindowConfig::new(size, stride),
            threshold,
            features: time_only(),
            ..Default::default()
        }
    }

    /// Z-score model on the window mean, trained around 0 with unit spread
    fn model() -> ScoringModel {
        let mut detector = DetectorSpec::new(DetectorKind::ZScore).build().into_result().unwrap();
        let rows: Vec<Vec<f64>> = (0..20).map(|i| vec![if i % 2 == 0 { -1.0 } else { 1.0 }]).collect();
        detector.fit(&rows, None).unwrap();
        ScoringModel::new(vec!["mean".to_string()], detector, None)
    }

    fn raw(asset: &str, i: i64, value: f64) -> RawRecord {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Record::new(asset, "vib", t0 + Duration::milliseconds(i * 10), value).into()
    }

    #[test]
    fn test_rejects_unfitted_model() {
        let detector = DetectorSpec::new(DetectorKind::Hbos).build().into_result().unwrap();
        let model = ScoringModel::new(vec!["mean".to_string()], detector, None);
        let result = StreamScorer::new(config(4, 2, 0.5), model);
        assert!(matches!(
            result,
            Err(ScorerError::Detector(DetectorError::NotFitted("hbos")))
        ));
    }

    #[test]
    fn test_rejects_bad_config() {
        let result = StreamScorer::new(config(4, 0, 0.5), model());
        assert!(matches!(result, Err(ScorerError::Config(_))));
        let result = StreamScorer::new(config(4, 2, f64::INFINITY), model());
        assert!(matches!(result, Err(ScorerError::Config(_))));
    }

    #[test]
    fn test_alert_only_at_or_above_threshold() {
        let mut scorer = StreamScorer::new(config(4, 4, 3.0), model()).unwrap();
        // mean 0 -> score 0, no alert
        for i in 0..4 {
            assert_eq!(scorer.process(raw("a", i, 0.0)).unwrap(), None);
        }
        // mean 3 -> score exactly 3
        let mut alerts = Vec::new();
        for i in 4..8 {
            alerts.extend(scorer.process(raw("a", i, 3.0)).unwrap());
        }
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].score, 3.0);
        assert_eq!(alerts[0].asset_id, "a");
        assert_eq!(alerts[0].features.get("mean"), Some(3.0));
        assert_eq!(scorer.stats().windows_scored, 2);
    }

    #[test]
    fn test_malformed_record_is_isolated() {
        let mut scorer = StreamScorer::new(config(2, 1, 0.5), model()).unwrap();
        let mut missing = raw("a", 0, 1.0);
        missing.value = None;
        assert!(matches!(
            scorer.process(missing),
            Err(ScorerError::Schema(SchemaError::MissingField("value")))
        ));
        assert_eq!(scorer.stats().rejected, 1);
        assert_eq!(scorer.stats().admitted, 0);
        assert_eq!(scorer.buffers().key_count(), 0);

        scorer.process(raw("a", 1, 1.0)).unwrap();
        assert_eq!(scorer.stats().admitted, 1);
    }

    #[test]
    fn test_keys_are_independent() {
        let mut scorer = StreamScorer::new(config(3, 3, 100.0), model()).unwrap();
        for i in 0..3 {
            scorer.process(raw("a", i, 0.0)).unwrap();
            scorer.process(raw("b", i, 0.0)).unwrap();
        }
        assert_eq!(scorer.buffers().key_count(), 2);
        assert_eq!(scorer.stats().windows_scored, 2);
    }

    #[test]
    fn test_soft_key_limit_warns_once() {
        let mut cfg = config(2, 1, 100.0);
        cfg.max_keys = 1;
        let mut scorer = StreamScorer::new(cfg, model()).unwrap();
        scorer.process(raw("a", 0, 0.0)).unwrap();
        assert!(!scorer.key_limit_warned);
        scorer.process(raw("b", 0, 0.0)).unwrap();
        scorer.process(raw("c", 0, 0.0)).unwrap();
        assert!(scorer.key_limit_warned);
        assert_eq!(scorer.buffers().key_count(), 3);
    }

    #[tokio::test]
    async fn test_run_skips_bad_records_and_drains() {
        let mut scorer = StreamScorer::new(config(2, 2, 2.0), model()).unwrap();
        let (tx, rx) = mpsc::channel(16);
        tx.send(raw("a", 0, 5.0)).await.unwrap();
        tx.send(RawRecord::default()).await.unwrap();
        tx.send(raw("a", 1, 5.0)).await.unwrap();
        tx.send(raw("a", 2, 0.0)).await.unwrap();
        tx.send(raw("a", 3, 0.0)).await.unwrap();
        drop(tx);

        let mut sink = VecSink::new();
        let stats = scorer.run(rx, &mut sink).await.unwrap();
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.admitted, 4);
        assert_eq!(stats.windows_scored, 2);
        assert_eq!(sink.alerts.len(), 1);
        assert_eq!(sink.alerts[0].score, 5.0);
    }

    #[tokio::test]
    async fn test_shutdown_discards_buffered_state() {
        let mut scorer = StreamScorer::new(config(10, 5, 0.0), model()).unwrap();
        let (tx, rx) = mpsc::channel(16);
        for i in 0..3 {
            tx.send(raw("a", i, 1.0)).await.unwrap();
        }

        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let mut sink = VecSink::new();
        let handle = async {
            scorer
                .run_until(rx, &mut sink, async {
                    let _ = stop_rx.await;
                })
                .await
        };
        let stopper = async {
            tokio::task::yield_now().await;
            let _ = stop_tx.send(());
        };
        let (result, _) = tokio::join!(handle, stopper);

        assert!(result.is_ok());
        assert!(sink.alerts.is_empty());
        assert_eq!(scorer.buffers().key_count(), 0);
        drop(tx);
    }

    #[test]
    fn test_reindexes_onto_model_columns() {
        let mut scorer = StreamScorer::new(config(2, 2, 0.0), model()).unwrap();
        scorer.process(raw("a", 0, 0.0)).unwrap();
        let alert = scorer.process(raw("a", 1, 0.0)).unwrap().unwrap();
        // live vector carries every time-domain feature, model reads only "mean"
        assert!(alert.features.len() > 1);
        let mut only_mean = FeatureVector::new();
        only_mean.insert("mean", 0.0);
        assert_eq!(scorer.model.score_vector(&only_mean).unwrap(), alert.score);
    }
}
