//! Mock runtime for testing

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, FixedOffset};
use futures::stream;
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::{ContainerInfo, ContainerRuntime, LogStream, Result, RuntimeError};

/// A scripted in-memory runtime.
///
/// Tests set the visible container set and per-container timestamped log
/// lines; `log_stream` honors `since` with the same inclusive semantics
/// as Docker and then stays open (follow mode) until dropped.
#[derive(Clone, Default)]
pub struct MockRuntime {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    containers: Vec<ContainerInfo>,
    logs: HashMap<String, Vec<String>>,
    fail_listing: bool,
    list_calls: usize,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the set of visible containers
    pub fn set_containers(&self, containers: Vec<ContainerInfo>) {
        self.state.lock().containers = containers;
    }

    /// Set the full log history for a container ID. Lines must carry the
    /// usual `RFC3339-nano SP content` framing and no trailing newline.
    pub fn set_log_lines(&self, container_id: &str, lines: Vec<String>) {
        self.state
            .lock()
            .logs
            .insert(container_id.to_string(), lines);
    }

    /// Make subsequent `list_containers` calls fail
    pub fn fail_listing(&self, fail: bool) {
        self.state.lock().fail_listing = fail;
    }

    /// Number of `list_containers` calls observed
    pub fn list_calls(&self) -> usize {
        self.state.lock().list_calls
    }
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    async fn list_containers(&self) -> Result<Vec<ContainerInfo>> {
        let mut state = self.state.lock();
        state.list_calls += 1;
        if state.fail_listing {
            return Err(RuntimeError::Unavailable("listing disabled".to_string()));
        }
        Ok(state.containers.clone())
    }

    async fn log_stream(&self, container_id: &str, since: Option<&str>) -> Result<LogStream> {
        let lines = {
            let state = self.state.lock();
            match state.logs.get(container_id) {
                Some(lines) => lines.clone(),
                None => {
                    return Err(RuntimeError::Unavailable(format!(
                        "no such container: {}",
                        container_id
                    )))
                }
            }
        };

        let cursor = since.and_then(|s| DateTime::parse_from_rfc3339(s).ok());
        let selected: Vec<crate::Result<Bytes>> = lines
            .into_iter()
            .filter(|line| included(line, cursor))
            .map(|line| Ok(Bytes::from(format!("{}\n", line))))
            .collect();

        Ok(Box::pin(stream::iter(selected).chain(stream::pending())))
    }
}

/// Docker's `since` is inclusive: keep lines whose timestamp is at or
/// after the cursor. Lines with no parseable timestamp are kept.
fn included(line: &str, cursor: Option<DateTime<FixedOffset>>) -> bool {
    let cursor = match cursor {
        Some(c) => c,
        None => return true,
    };
    let token = match line.split_whitespace().next() {
        Some(t) => t,
        None => return true,
    };
    match DateTime::parse_from_rfc3339(token) {
        Ok(ts) => ts >= cursor,
        Err(_) => true,
    }
}
