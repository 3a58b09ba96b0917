//! Error types for Docktail

use std::path::PathBuf;

/// Docktail error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Log writer is closed")]
    WriterClosed,

    #[error("Rotation failed for {path}: {reason}")]
    RotationFailed { path: PathBuf, reason: String },

    #[error("Invalid size: {0}")]
    InvalidSize(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("No container names configured")]
    NoContainers,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

/// Result type alias for Docktail
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::ConfigError(msg.into())
    }

    pub fn rotation<P: Into<PathBuf>, S: Into<String>>(path: P, reason: S) -> Self {
        Error::RotationFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
