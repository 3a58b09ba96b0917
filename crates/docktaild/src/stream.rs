//! Streaming one container's log output into its rotating file

use chrono::{DateTime, SecondsFormat};
use docktail_core::{short_id, Settings};
use docktail_logs::{last_line, RotatingLogWriter, RotationConfig};
use docktail_runtime::ContainerRuntime;
use futures::StreamExt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// One cancellable unit of work: resume, open, and copy a single
/// container's log stream into its rotating file.
///
/// The task never restarts itself; on any exit the monitor observes the
/// entry as not-running and relaunches on its next cycle.
pub struct StreamTask {
    runtime: Arc<dyn ContainerRuntime>,
    name: String,
    container_id: String,
    log_root: PathBuf,
    rotation: RotationConfig,
}

impl StreamTask {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        name: &str,
        container_id: &str,
        settings: &Settings,
    ) -> Self {
        Self {
            runtime,
            name: name.to_string(),
            container_id: container_id.to_string(),
            log_root: settings.log_root.clone(),
            rotation: RotationConfig::new(settings.limit_bytes, settings.compression),
        }
    }

    /// Run until the stream ends, a write fails, or `cancel` fires. The
    /// writer is always closed before returning.
    pub async fn run(self, cancel: CancellationToken) {
        info!(
            container = %self.name,
            id = short_id(&self.container_id),
            "starting log stream"
        );

        let writer =
            match RotatingLogWriter::new(&self.log_root, &self.name, self.rotation.clone()) {
                Ok(writer) => writer,
                Err(e) => {
                    error!(container = %self.name, error = %e, "failed to open log file");
                    return;
                }
            };

        let since = self.resume_point(writer.path());
        debug!(container = %self.name, since = ?since, "resuming log stream");

        let opened = tokio::select! {
            _ = cancel.cancelled() => {
                info!(container = %self.name, "log stream cancelled");
                self.finish(&writer);
                return;
            }
            result = self.runtime.log_stream(&self.container_id, since.as_deref()) => result,
        };
        let mut stream = match opened {
            Ok(stream) => stream,
            Err(e) => {
                warn!(container = %self.name, error = %e, "failed to open log stream");
                self.finish(&writer);
                return;
            }
        };

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(container = %self.name, "log stream cancelled");
                    break;
                }
                chunk = stream.next() => match chunk {
                    Some(Ok(bytes)) => {
                        if let Err(e) = writer.write(&bytes) {
                            error!(container = %self.name, error = %e, "failed to write log data");
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        error!(container = %self.name, error = %e, "log stream failed");
                        break;
                    }
                    None => {
                        info!(container = %self.name, "log stream ended");
                        break;
                    }
                }
            }
        }

        // Dropping the stream closes the underlying handle, so a read
        // blocked on the runtime does not outlive the task.
        drop(stream);
        self.finish(&writer);
    }

    fn finish(&self, writer: &RotatingLogWriter) {
        if let Err(e) = writer.close() {
            error!(container = %self.name, error = %e, "failed to close log file");
        }
    }

    /// Determine the `since` cursor from the last persisted line.
    /// Any failure here degrades to streaming from the beginning.
    fn resume_point(&self, path: &Path) -> Option<String> {
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(e) => {
                warn!(container = %self.name, error = %e, "cannot open log file for resume, streaming from start");
                return None;
            }
        };
        let last = match last_line(&mut file) {
            Ok(last) => last,
            Err(e) => {
                warn!(container = %self.name, error = %e, "cannot read last log line, streaming from start");
                return None;
            }
        };
        if last.is_empty() {
            return None;
        }
        last.split_whitespace().next().map(advance_cursor)
    }
}

/// Advance an RFC3339-nanosecond timestamp by one nanosecond, so the
/// upstream source (whose `since` is inclusive) does not re-deliver the
/// already-persisted line. An unparseable token is returned verbatim,
/// trading a possible duplicate line for progress.
fn advance_cursor(timestamp: &str) -> String {
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(ts) => (ts + chrono::Duration::nanoseconds(1))
            .to_rfc3339_opts(SecondsFormat::Nanos, true),
        Err(e) => {
            warn!(timestamp, error = %e, "unparseable timestamp in last log line, using raw token");
            timestamp.to_string()
        }
    }
}
