//! Docktail Runtime - the container runtime boundary
//!
//! The daemon consumes the container runtime through the
//! [`ContainerRuntime`] trait: listing running containers and opening
//! follow-mode log streams. [`DockerRuntime`] implements it against the
//! Docker API via bollard; [`MockRuntime`] implements it in memory for
//! tests.

mod docker;
mod mock;

pub use docker::DockerRuntime;
pub use mock::MockRuntime;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

/// Container runtime errors
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Docker API error
    #[error("Container API error: {0}")]
    Api(#[from] bollard::errors::Error),

    /// Runtime reachable but the request cannot be served
    #[error("Runtime unavailable: {0}")]
    Unavailable(String),

    /// Error surfaced mid-stream
    #[error("Log stream error: {0}")]
    Stream(String),
}

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// A running container as reported by the runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    /// Runtime-assigned container ID
    pub id: String,
    /// All names/aliases the runtime knows the container by
    pub names: Vec<String>,
}

/// Demultiplexed log bytes: stdout and stderr interleaved, each line
/// prefixed with an RFC3339-nanosecond timestamp and a space.
pub type LogStream = BoxStream<'static, Result<Bytes>>;

/// The external container runtime boundary
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// List running containers
    async fn list_containers(&self) -> Result<Vec<ContainerInfo>>;

    /// Open a follow-mode log stream for a container: stdout + stderr,
    /// per-line timestamps, starting at `since` (inclusive) when given.
    async fn log_stream(&self, container_id: &str, since: Option<&str>) -> Result<LogStream>;
}
