//! JSON-lines Replay Source

use signal_window::RawRecord;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Stream records from a line reader into a bounded channel, in order.
///
/// Blank lines are ignored, unparsable lines are logged and skipped. With a
/// non-zero `delay` the source sleeps between records. The task ends at end
/// of input or when the receiver is dropped, returning the number of records
/// sent.
pub fn spawn_replay<R>(reader: R, capacity: usize, delay: Duration) -> (mpsc::Receiver<RawRecord>, JoinHandle<u64>)
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<RawRecord>(capacity.max(1));

    let handle = tokio::spawn(async move {
        let mut lines = reader.lines();
        let mut line_no = 0u64;
        let mut sent = 0u64;

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    warn!("Replay input failed after line {}: {}", line_no, e);
                    break;
                }
            };
            line_no += 1;
            if line.trim().is_empty() {
                continue;
            }

            let record: RawRecord = match serde_json::from_str(&line) {
                Ok(record) => record,
                Err(e) => {
                    warn!("Skipping unparsable line {}: {}", line_no, e);
                    continue;
                }
            };

            if tx.send(record).await.is_err() {
                debug!("Replay receiver dropped");
                break;
            }
            sent += 1;

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        info!("Replay finished: {} records from {} lines", sent, line_no);
        sent
    });

    (rx, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    const INPUT: &str = r#"{"asset_id":"a","channel":"x","timestamp":"2024-01-01T00:00:00Z","value":1.0}

not json
{"asset_id":"a","channel":"x","timestamp":"2024-01-01T00:00:00.001Z","value":2.0,"rpm":1500.0}
{"channel":"x","value":3.0}
"#;

    #[tokio::test]
    async fn test_replays_parsable_lines_in_order() {
        let (mut rx, handle) = spawn_replay(BufReader::new(INPUT.as_bytes()), 2, Duration::ZERO);

        let mut received = Vec::new();
        while let Some(record) = rx.recv().await {
            received.push(record);
        }
        assert_eq!(handle.await.unwrap(), 3);
        assert_eq!(received.len(), 3);
        assert_eq!(received[0].value, Some(1.0));
        assert_eq!(received[1].rpm, Some(1500.0));
        // structurally valid JSON passes through; the scorer rejects it
        assert_eq!(received[2].asset_id, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_between_records() {
        let start = tokio::time::Instant::now();
        let (mut rx, handle) = spawn_replay(BufReader::new(INPUT.as_bytes()), 1, Duration::from_millis(100));
        while rx.recv().await.is_some() {}
        handle.await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_stops_when_receiver_dropped() {
        let (rx, handle) = spawn_replay(BufReader::new(INPUT.as_bytes()), 1, Duration::ZERO);
        drop(rx);
        assert_eq!(handle.await.unwrap(), 0);
    }
}
