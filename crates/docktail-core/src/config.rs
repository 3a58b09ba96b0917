//! Configuration for Docktail
//!
//! Runtime settings are resolved from CLI flags merged over an optional
//! TOML config file.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants;
use crate::error::{Error, Result};

/// Resolved runtime settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// Root directory for per-container log directories
    pub log_root: PathBuf,
    /// Per-file size limit in bytes
    pub limit_bytes: u64,
    /// Container names to monitor
    pub containers: Vec<String>,
    /// Gzip-compress rotated files
    pub compression: bool,
    /// Interval between container list polls
    pub poll_interval: Duration,
    /// Backoff before retrying a failed list call
    pub retry_interval: Duration,
}

impl Settings {
    pub fn new(
        log_root: PathBuf,
        limit_bytes: u64,
        containers: Vec<String>,
        compression: bool,
    ) -> Result<Self> {
        if containers.is_empty() || containers.iter().all(|n| n.is_empty()) {
            return Err(Error::NoContainers);
        }
        Ok(Self {
            log_root,
            limit_bytes,
            containers: containers.into_iter().filter(|n| !n.is_empty()).collect(),
            compression,
            poll_interval: constants::POLL_INTERVAL,
            retry_interval: constants::LIST_RETRY_INTERVAL,
        })
    }
}

/// Config file structure (docktail.toml)
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    /// Root directory for log output
    pub log_path: Option<PathBuf>,
    /// Per-file size limit, human-readable (e.g. "50MB", "1GiB")
    pub limit: Option<String>,
    /// Container names to monitor
    #[serde(default)]
    pub containers: Vec<String>,
    /// Gzip-compress rotated files
    pub compression: Option<bool>,
}

impl ConfigFile {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

/// Parse a human-friendly size into bytes.
///
/// Supports raw bytes (`"1234"`), base10 suffixes `k/m/g/t` and base2
/// suffixes `ki/mi/gi/ti`, each with an optional trailing `b`, case
/// insensitive, decimal numbers allowed (`"1.5GiB"`).
pub fn parse_size(s: &str) -> Result<u64> {
    let t = s.trim();
    if t.is_empty() {
        return Err(Error::InvalidSize(s.to_string()));
    }
    if t.chars().all(|c| c.is_ascii_digit()) {
        return t.parse().map_err(|_| Error::InvalidSize(s.to_string()));
    }

    let idx = t
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || *c == '.'))
        .map(|(i, _)| i)
        .unwrap_or(0);
    if idx == 0 {
        return Err(Error::InvalidSize(s.to_string()));
    }

    let (num_s, unit_s) = t.split_at(idx);
    let num: f64 = num_s
        .parse()
        .map_err(|_| Error::InvalidSize(s.to_string()))?;

    let mut unit = unit_s.trim().to_ascii_lowercase();
    if unit.len() > 1 && unit.ends_with('b') {
        unit.pop();
    }
    let mult: f64 = match unit.as_str() {
        "" | "b" => 1.0,
        "k" => 1000.0,
        "m" => 1000.0_f64.powi(2),
        "g" => 1000.0_f64.powi(3),
        "t" => 1000.0_f64.powi(4),
        "ki" => 1024.0,
        "mi" => 1024.0_f64.powi(2),
        "gi" => 1024.0_f64.powi(3),
        "ti" => 1024.0_f64.powi(4),
        _ => return Err(Error::InvalidSize(s.to_string())),
    };

    Ok((num * mult) as u64)
}
