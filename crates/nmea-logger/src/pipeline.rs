//! Ingestion Pipeline
//!
//! Wires the socket stream through decode/select into the store and owns the
//! top-level failure policy: parse errors skip the line, connection errors
//! reconnect with backoff, storage errors are retried a bounded number of
//! times and then fatal.

use crate::config::LoggerConfig;
use field_selector::{FieldSelector, SelectedRecord};
use nmea_protocol::{decode, ParseError, SentenceStream};
use std::future::Future;
use std::time::Duration;
use storage::{StorageError, TelemetryStore};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Delay between immediate append retries
const STORAGE_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Running totals, logged on disconnect and shutdown
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    pub lines_read: u64,
    pub parse_errors: u64,
    pub records_written: u64,
    pub sentences_skipped: u64,
}

/// The supervisor: Connecting ⇄ Streaming, Fatal on an unrecoverable storage
/// fault. One logical stream of work; rows are committed in arrival order and
/// the store is never written concurrently.
pub struct Pipeline {
    config: LoggerConfig,
    selector: FieldSelector,
    store: TelemetryStore,
    stats: PipelineStats,
}

impl Pipeline {
    /// Open the store and build the pipeline.
    pub async fn new(config: LoggerConfig) -> Result<Self, StorageError> {
        let store = TelemetryStore::open(&config.storage_path).await?;
        Ok(Self {
            config,
            selector: FieldSelector::new(),
            store,
            stats: PipelineStats::default(),
        })
    }

    /// Run until `shutdown` resolves (graceful, returns the run totals) or a
    /// storage fault survives all retries (the error propagates and the
    /// process should exit non-zero).
    ///
    /// Shutdown mid-read or mid-backoff drops the socket and closes the
    /// store; no transaction is left open either way, since every append
    /// commits before the next line is read.
    pub async fn run(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<PipelineStats, StorageError> {
        tokio::pin!(shutdown);
        let mut backoff = self.config.backoff();

        let result = 'supervise: loop {
            // Connecting
            let mut stream = tokio::select! {
                _ = &mut shutdown => break 'supervise Ok(()),
                connected = SentenceStream::connect(
                    &self.config.host,
                    self.config.port,
                    self.config.read_timeout(),
                ) => match connected {
                    Ok(stream) => {
                        backoff.reset();
                        stream
                    }
                    Err(err) => {
                        let delay = backoff.next_delay();
                        warn!(error = %err, ?delay, "connect failed, backing off");
                        tokio::select! {
                            _ = &mut shutdown => break 'supervise Ok(()),
                            _ = sleep(delay) => continue 'supervise,
                        }
                    }
                },
            };

            // Streaming
            loop {
                let line = tokio::select! {
                    _ = &mut shutdown => break 'supervise Ok(()),
                    line = stream.next_line() => match line {
                        Ok(line) => line,
                        Err(err) => {
                            warn!(error = %err, peer = stream.peer(), "stream ended, reconnecting");
                            info!(stats = ?self.stats, "session totals");
                            // drop the old handle before the next attempt
                            break;
                        }
                    },
                };
                self.stats.lines_read += 1;
                if line.is_empty() {
                    continue;
                }
                if let Err(err) = self.ingest(&line).await {
                    break 'supervise Err(err);
                }
            }
        };

        info!(stats = ?self.stats, "pipeline stopped");
        self.store.close().await;
        result.map(|()| self.stats)
    }

    /// Decode, select, and persist one line. Only storage faults propagate.
    async fn ingest(&mut self, line: &str) -> Result<(), StorageError> {
        let sentence = match decode(line) {
            Ok(sentence) => sentence,
            Err(ParseError::Unsupported(address)) => {
                self.stats.sentences_skipped += 1;
                debug!(%address, "ignoring unsupported sentence");
                return Ok(());
            }
            Err(err) => {
                self.stats.parse_errors += 1;
                warn!(error = %err, line, "discarding malformed sentence");
                return Ok(());
            }
        };
        let Some(record) = self.selector.select(&sentence) else {
            self.stats.sentences_skipped += 1;
            return Ok(());
        };
        self.append_with_retry(&record).await?;
        self.stats.records_written += 1;
        Ok(())
    }

    /// A failed append gets a small number of immediate retries; a fault that
    /// survives them is fatal, since running on without durable writes would
    /// silently break the logger's one guarantee.
    async fn append_with_retry(&self, record: &SelectedRecord) -> Result<i64, StorageError> {
        let mut attempt = 0;
        loop {
            match self.store.append(record).await {
                Ok(id) => {
                    debug!(id, source = %record.source, "persisted");
                    return Ok(id);
                }
                Err(err) if attempt < self.config.storage_retries => {
                    attempt += 1;
                    warn!(error = %err, attempt, "append failed, retrying");
                    sleep(STORAGE_RETRY_DELAY).await;
                }
                Err(err) => {
                    error!(
                        error = %err,
                        retries = self.config.storage_retries,
                        "append failed after retries, giving up"
                    );
                    return Err(err);
                }
            }
        }
    }
}
