//! Docker implementation of the runtime boundary

use async_trait::async_trait;
use bollard::container::{ListContainersOptions, LogOutput, LogsOptions};
use bollard::Docker;
use futures::StreamExt;
use tracing::warn;

use crate::{ContainerInfo, ContainerRuntime, LogStream, Result, RuntimeError};

/// Docker-backed container runtime
pub struct DockerRuntime {
    client: Docker,
}

impl DockerRuntime {
    /// Connect using the standard environment (DOCKER_HOST or the local
    /// socket)
    pub fn connect() -> Result<Self> {
        let client = Docker::connect_with_local_defaults()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn list_containers(&self) -> Result<Vec<ContainerInfo>> {
        let options = ListContainersOptions::<String> {
            all: false,
            ..Default::default()
        };
        let summaries = self.client.list_containers(Some(options)).await?;

        Ok(summaries
            .into_iter()
            .map(|c| ContainerInfo {
                id: c.id.unwrap_or_default(),
                names: c.names.unwrap_or_default(),
            })
            .collect())
    }

    async fn log_stream(&self, container_id: &str, since: Option<&str>) -> Result<LogStream> {
        let options = LogsOptions::<String> {
            follow: true,
            stdout: true,
            stderr: true,
            timestamps: true,
            since: since.map(since_to_unix).unwrap_or(0),
            tail: "all".to_string(),
            ..Default::default()
        };

        let stream = self
            .client
            .logs(container_id, Some(options))
            .map(|item| {
                item.map(LogOutput::into_bytes)
                    .map_err(RuntimeError::from)
            })
            .boxed();
        Ok(stream)
    }
}

/// Convert a resume cursor into the unix timestamp bollard's `since`
/// carries. The cursor is nanosecond-precise; bollard exposes whole
/// seconds, and flooring errs toward re-delivery rather than gaps.
fn since_to_unix(cursor: &str) -> i64 {
    if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(cursor) {
        return ts.timestamp();
    }
    if let Ok(secs) = cursor.parse::<i64>() {
        return secs;
    }
    warn!(cursor, "unparseable resume cursor, streaming from the beginning");
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_since_to_unix_rfc3339() {
        assert_eq!(since_to_unix("2024-01-01T10:00:00.000000001Z"), 1704103200);
    }

    #[test]
    fn test_since_to_unix_plain_seconds() {
        assert_eq!(since_to_unix("1704103200"), 1704103200);
    }

    #[test]
    fn test_since_to_unix_garbage() {
        assert_eq!(since_to_unix("not-a-timestamp"), 0);
    }
}
