//! Container lifecycle monitor
//!
//! Polls the runtime for the monitored names, diffs observed container
//! IDs against tracked state, and keeps exactly one streaming task per
//! name alive. A replacement task is never launched before the previous
//! task for the same name has fully released its log file.

use docktail_core::{short_id, Settings};
use docktail_runtime::{ContainerInfo, ContainerRuntime};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::stream::StreamTask;

/// Tracked state for one monitored name
struct TrackedContainer {
    /// Container instance currently believed running
    id: String,
    /// Cancellation scope of the current stream task
    cancel: CancellationToken,
    /// Resolves once the task has released its file and stream handles
    done: JoinHandle<()>,
    /// Cleared by the task itself on exit
    running: Arc<AtomicBool>,
}

/// What the poll cycle decided for one name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    /// Not tracked, not observed
    Ignore,
    /// Same ID, task still running
    Keep,
    /// Observed but not tracked
    Start,
    /// ID changed, or the previous task exited on its own
    Restart,
    /// Tracked but no longer observed
    Stop,
}

/// Decide the transition for one name from its tracked state
/// (`(current_id, running)`) and the ID observed in the latest poll.
fn plan(tracked: Option<(&str, bool)>, observed: Option<&str>) -> Action {
    match (tracked, observed) {
        (None, None) => Action::Ignore,
        (Some(_), None) => Action::Stop,
        (None, Some(_)) => Action::Start,
        (Some((id, running)), Some(new_id)) => {
            if id == new_id && running {
                Action::Keep
            } else {
                Action::Restart
            }
        }
    }
}

/// Match listed containers against the monitored names. Runtime aliases
/// carry a leading `/`; the first matching alias wins.
fn match_names(containers: &[ContainerInfo], monitored: &[String]) -> HashMap<String, String> {
    let mut observed = HashMap::new();
    for container in containers {
        for alias in &container.names {
            let alias = alias.strip_prefix('/').unwrap_or(alias);
            if monitored.iter().any(|name| name == alias) {
                observed.insert(alias.to_string(), container.id.clone());
                break;
            }
        }
    }
    observed
}

/// The top-level control loop
pub struct Monitor {
    runtime: Arc<dyn ContainerRuntime>,
    settings: Settings,
    tracked: HashMap<String, TrackedContainer>,
}

impl Monitor {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, settings: Settings) -> Self {
        Self {
            runtime,
            settings,
            tracked: HashMap::new(),
        }
    }

    /// Poll forever. List failures are retried on a shorter interval
    /// without touching tracked state.
    pub async fn run(&mut self) {
        loop {
            let wait = match self.poll_cycle().await {
                Ok(()) => self.settings.poll_interval,
                Err(e) => {
                    warn!(error = %e, "failed to list containers");
                    self.settings.retry_interval
                }
            };
            tokio::time::sleep(wait).await;
        }
    }

    /// One list/diff/apply pass over all monitored names
    pub async fn poll_cycle(&mut self) -> docktail_runtime::Result<()> {
        let containers = self.runtime.list_containers().await?;
        let observed = match_names(&containers, &self.settings.containers);

        let names = self.settings.containers.clone();
        for name in &names {
            self.apply(name, observed.get(name).map(String::as_str))
                .await;
        }
        Ok(())
    }

    /// Cancel and await every tracked task
    pub async fn shutdown(&mut self) {
        for (name, entry) in self.tracked.drain() {
            info!(container = %name, id = short_id(&entry.id), "stopping log stream");
            stop_task(entry).await;
        }
    }

    async fn apply(&mut self, name: &str, observed: Option<&str>) {
        let current = self
            .tracked
            .get(name)
            .map(|t| (t.id.clone(), t.running.load(Ordering::SeqCst)));
        let action = plan(
            current.as_ref().map(|(id, running)| (id.as_str(), *running)),
            observed,
        );

        match action {
            Action::Ignore | Action::Keep => {}
            Action::Stop => {
                if let Some(entry) = self.tracked.remove(name) {
                    info!(
                        container = name,
                        id = short_id(&entry.id),
                        "container stopped, ending log stream"
                    );
                    stop_task(entry).await;
                }
            }
            Action::Start | Action::Restart => {
                let new_id = match observed {
                    Some(id) => id,
                    None => return,
                };
                // The previous task must have fully released the log
                // file before a replacement may open it.
                if let Some(entry) = self.tracked.remove(name) {
                    info!(
                        container = name,
                        old_id = short_id(&entry.id),
                        new_id = short_id(new_id),
                        "container restarted, relaunching log stream"
                    );
                    stop_task(entry).await;
                } else {
                    info!(
                        container = name,
                        id = short_id(new_id),
                        "new container, starting log stream"
                    );
                }
                let entry = self.launch(name, new_id);
                self.tracked.insert(name.to_string(), entry);
            }
        }
    }

    fn launch(&self, name: &str, id: &str) -> TrackedContainer {
        let cancel = CancellationToken::new();
        let running = Arc::new(AtomicBool::new(true));
        let task = StreamTask::new(Arc::clone(&self.runtime), name, id, &self.settings);

        let done = tokio::spawn({
            let cancel = cancel.clone();
            let running = Arc::clone(&running);
            async move {
                task.run(cancel).await;
                running.store(false, Ordering::SeqCst);
            }
        });

        TrackedContainer {
            id: id.to_string(),
            cancel,
            done,
            running,
        }
    }
}

async fn stop_task(entry: TrackedContainer) {
    entry.cancel.cancel();
    if let Err(e) = entry.done.await {
        warn!(error = %e, "log stream task panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docktail_runtime::MockRuntime;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_plan_steady_state() {
        assert_eq!(plan(Some(("abc", true)), Some("abc")), Action::Keep);
    }

    #[test]
    fn test_plan_unmonitored() {
        assert_eq!(plan(None, None), Action::Ignore);
    }

    #[test]
    fn test_plan_new_container() {
        assert_eq!(plan(None, Some("abc")), Action::Start);
    }

    #[test]
    fn test_plan_container_gone() {
        assert_eq!(plan(Some(("abc", true)), None), Action::Stop);
        assert_eq!(plan(Some(("abc", false)), None), Action::Stop);
    }

    #[test]
    fn test_plan_id_change_restarts() {
        assert_eq!(plan(Some(("abc", true)), Some("def")), Action::Restart);
    }

    #[test]
    fn test_plan_dead_task_restarts_same_id() {
        assert_eq!(plan(Some(("abc", false)), Some("abc")), Action::Restart);
    }

    #[test]
    fn test_match_names_strips_slash_prefix() {
        let containers = vec![ContainerInfo {
            id: "abc123".to_string(),
            names: vec!["/web".to_string()],
        }];
        let observed = match_names(&containers, &["web".to_string()]);
        assert_eq!(observed.get("web").map(String::as_str), Some("abc123"));
    }

    #[test]
    fn test_match_names_first_alias_wins() {
        let containers = vec![ContainerInfo {
            id: "abc123".to_string(),
            names: vec!["/web".to_string(), "/db".to_string()],
        }];
        let observed = match_names(&containers, &["web".to_string(), "db".to_string()]);
        assert_eq!(observed.len(), 1);
        assert!(observed.contains_key("web"));
    }

    #[test]
    fn test_match_names_ignores_unmonitored() {
        let containers = vec![ContainerInfo {
            id: "abc123".to_string(),
            names: vec!["/other".to_string()],
        }];
        let observed = match_names(&containers, &["web".to_string()]);
        assert!(observed.is_empty());
    }

    fn ts(offset_secs: u64, content: &str) -> String {
        format!("2024-01-01T10:00:{:02}.000000000Z {}", offset_secs, content)
    }

    fn test_monitor(dir: &Path, mock: &MockRuntime) -> Monitor {
        let settings = Settings::new(
            dir.to_path_buf(),
            1024 * 1024,
            vec!["web".to_string()],
            false,
        )
        .unwrap();
        Monitor::new(Arc::new(mock.clone()), settings)
    }

    fn web(id: &str) -> ContainerInfo {
        ContainerInfo {
            id: id.to_string(),
            names: vec!["/web".to_string()],
        }
    }

    async fn wait_for_content(path: &Path, needle: &str) {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if let Ok(content) = std::fs::read_to_string(path) {
                    if content.contains(needle) {
                        return;
                    }
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("content never appeared");
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let dir = TempDir::new().unwrap();
        let mock = MockRuntime::new();
        mock.set_containers(vec![web("abc123")]);
        mock.set_log_lines("abc123", vec![ts(0, "L1")]);

        let mut monitor = test_monitor(dir.path(), &mock);
        monitor.poll_cycle().await.unwrap();
        assert!(monitor.tracked.contains_key("web"));

        let path = dir.path().join("web/web.log");
        wait_for_content(&path, "L1").await;

        // Container disappears: the task is cancelled and the entry
        // removed.
        mock.set_containers(vec![]);
        monitor.poll_cycle().await.unwrap();
        assert!(monitor.tracked.is_empty());
    }

    #[tokio::test]
    async fn test_list_failure_leaves_tracked_state_alone() {
        let dir = TempDir::new().unwrap();
        let mock = MockRuntime::new();
        mock.set_containers(vec![web("abc123")]);
        mock.set_log_lines("abc123", vec![ts(0, "L1")]);

        let mut monitor = test_monitor(dir.path(), &mock);
        monitor.poll_cycle().await.unwrap();
        assert!(monitor.tracked.contains_key("web"));

        mock.fail_listing(true);
        assert!(monitor.poll_cycle().await.is_err());
        assert!(monitor.tracked.contains_key("web"));

        monitor.shutdown().await;
    }

    #[tokio::test]
    async fn test_dead_task_is_relaunched() {
        let dir = TempDir::new().unwrap();
        let mock = MockRuntime::new();
        // Container listed but no log history: the first task's stream
        // open fails and the task exits on its own.
        mock.set_containers(vec![web("abc123")]);

        let mut monitor = test_monitor(dir.path(), &mock);
        monitor.poll_cycle().await.unwrap();

        // Wait for the task to die.
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let running = monitor.tracked["web"].running.load(Ordering::SeqCst);
                if !running {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        // Next cycle relaunches; this time the stream exists.
        mock.set_log_lines("abc123", vec![ts(0, "recovered")]);
        monitor.poll_cycle().await.unwrap();

        let path = dir.path().join("web/web.log");
        wait_for_content(&path, "recovered").await;

        monitor.shutdown().await;
    }

    #[tokio::test]
    async fn test_restart_waits_for_previous_task() {
        let dir = TempDir::new().unwrap();
        let mock = MockRuntime::new();
        mock.set_containers(vec![web("abc123")]);
        mock.set_log_lines("abc123", vec![ts(0, "L1")]);

        let mut monitor = test_monitor(dir.path(), &mock);
        monitor.poll_cycle().await.unwrap();
        wait_for_content(&dir.path().join("web/web.log"), "L1").await;

        let first_running = Arc::clone(&monitor.tracked["web"].running);

        // Same name, new ID.
        mock.set_containers(vec![web("def456")]);
        mock.set_log_lines("def456", vec![ts(0, "L1"), ts(1, "L2")]);
        monitor.poll_cycle().await.unwrap();

        // The old task had fully exited before the new one launched.
        assert!(!first_running.load(Ordering::SeqCst));
        assert_eq!(monitor.tracked["web"].id, "def456");

        monitor.shutdown().await;
    }

    #[tokio::test]
    async fn test_restart_resumes_without_duplicates() {
        let dir = TempDir::new().unwrap();
        let mock = MockRuntime::new();
        mock.set_containers(vec![web("abc123")]);
        mock.set_log_lines(
            "abc123",
            vec![ts(0, "L1"), ts(1, "L2"), ts(2, "L3")],
        );

        let mut monitor = test_monitor(dir.path(), &mock);
        monitor.poll_cycle().await.unwrap();

        let path = dir.path().join("web/web.log");
        wait_for_content(&path, "L3").await;

        // The container is recreated under a new ID; its log history
        // repeats the earlier lines.
        mock.set_containers(vec![web("def456")]);
        mock.set_log_lines(
            "def456",
            vec![ts(0, "L1"), ts(1, "L2"), ts(2, "L3"), ts(3, "L4")],
        );
        monitor.poll_cycle().await.unwrap();
        wait_for_content(&path, "L4").await;

        monitor.shutdown().await;

        let content = std::fs::read_to_string(&path).unwrap();
        let expected = format!(
            "{}\n{}\n{}\n{}\n",
            ts(0, "L1"),
            ts(1, "L2"),
            ts(2, "L3"),
            ts(3, "L4")
        );
        assert_eq!(content, expected);
        assert_eq!(content.matches("L3").count(), 1);
    }
}
