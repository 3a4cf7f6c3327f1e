//! ESI Pipeline - Main Entry Point
//!
//! Usage: `esi-pipeline [CONFIG]`. Trains on the configured history, then
//! scores JSON-lines records from stdin and prints alerts to stdout.

use alerting::JsonLinesSink;
use anyhow::Result;
use pipeline::{init_logging, score_stream, train_from_config, PipelineConfig};
use std::path::PathBuf;
use tokio::io::BufReader;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = PipelineConfig::load(config_path.as_deref())?;
    init_logging(&config.logging)?;

    info!("=== ESI Pipeline v{} ===", env!("CARGO_PKG_VERSION"));
    match &config_path {
        Some(path) => info!("Configuration: {}", path.display()),
        None => info!("Configuration: defaults and environment"),
    }

    let model = train_from_config(&config)?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let mut sink = JsonLinesSink::stdout();
    let reader = BufReader::new(tokio::io::stdin());
    let stats = score_stream(&config, model, reader, &mut sink, shutdown).await?;

    info!(
        "Done: {} records admitted, {} rejected, {} windows scored, {} alerts",
        stats.admitted, stats.rejected, stats.windows_scored, stats.alerts
    );
    Ok(())
}
