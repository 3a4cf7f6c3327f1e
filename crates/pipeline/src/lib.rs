//! ESI Pipeline
//!
//! Wires the library crates into a process: configuration, logging, batch
//! training on historical records and live scoring of a replayed stream.

mod replay;
mod settings;
mod training;

pub use replay::spawn_replay;
pub use settings::{LoggingConfig, PipelineConfig, ReplayConfig, TrainingConfig};
pub use training::{build_matrix, read_labels, read_records, report_bands, train};

use alerting::{AlertSink, StreamScorer, StreamStats};
use anomaly_engine::ScoringModel;
use anyhow::{anyhow, Context, Result};
use std::future::Future;
use std::time::Duration;
use tokio::io::AsyncBufRead;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// Install the process-wide subscriber. Call once, before anything logs.
///
/// Logs go to stderr so stdout stays free for alert lines. `RUST_LOG`
/// overrides the configured level.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow!(e)).context("Failed to set tracing subscriber")
}

/// Batch path: read history (and labels), build features, fit the model
pub fn train_from_config(config: &PipelineConfig) -> Result<ScoringModel> {
    let records = read_records(&config.training.input)?;
    let matrix = build_matrix(config, &records)?;
    let labels = config
        .training
        .labels
        .as_deref()
        .map(read_labels)
        .transpose()?;
    train(config, &matrix, labels.as_deref())
}

/// Live path: replay `reader` into a scorer until input ends or `shutdown`
/// resolves
pub async fn score_stream<R, S, F>(
    config: &PipelineConfig,
    model: ScoringModel,
    reader: R,
    sink: &mut S,
    shutdown: F,
) -> Result<StreamStats>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    S: AlertSink,
    F: Future<Output = ()>,
{
    let mut scorer = StreamScorer::new(config.stream.clone(), model)?;
    let (rx, replay) = spawn_replay(
        reader,
        config.replay.channel_capacity,
        Duration::from_millis(config.replay.delay_ms),
    );

    let stats = scorer.run_until(rx, sink, shutdown).await?;
    let _ = finish_replay(replay).await;
    info!("Stream finished: {} alerts", stats.alerts);
    Ok(stats)
}

/// Stop the replay task and collect its outcome: the number of records it
/// sent, or the join error. Panics are logged; cancellation is expected.
async fn finish_replay(replay: JoinHandle<u64>) -> Result<u64, JoinError> {
    replay.abort();
    let outcome = replay.await;
    match &outcome {
        Ok(sent) => debug!("Replay task sent {} records", sent),
        Err(e) if e.is_cancelled() => debug!("Replay task cancelled"),
        Err(e) => error!("Replay task failed: {}", e),
    }
    outcome
}
