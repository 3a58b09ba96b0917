//! Docktail Logs - Rotating log files, tail reading, on-disk layout

mod reader;
mod rotation;
mod writer;

pub use reader::last_line;
pub use rotation::RotationConfig;
pub use writer::RotatingLogWriter;

use docktail_core::Result;
use std::path::{Path, PathBuf};

/// Directory holding one container's log files: `<root>/<name>`
pub fn container_log_dir(root: &Path, name: &str) -> PathBuf {
    root.join(name)
}

/// Canonical active log file for a container: `<root>/<name>/<name>.log`
pub fn container_log_path(root: &Path, name: &str) -> PathBuf {
    container_log_dir(root, name).join(format!("{}.log", name))
}

/// Ensure a container's log directory exists
pub fn ensure_log_dir(root: &Path, name: &str) -> Result<PathBuf> {
    let dir = container_log_dir(root, name);
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
    }
    Ok(dir)
}
