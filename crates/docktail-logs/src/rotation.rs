//! Log rotation configuration

/// Log rotation configuration
#[derive(Debug, Clone)]
pub struct RotationConfig {
    /// Maximum log file size in bytes before rotation
    pub limit_bytes: u64,
    /// Gzip-compress rotated-out files
    pub compress: bool,
}

impl RotationConfig {
    pub fn new(limit_bytes: u64, compress: bool) -> Self {
        Self {
            limit_bytes,
            compress,
        }
    }
}
