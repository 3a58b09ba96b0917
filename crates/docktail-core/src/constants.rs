//! Constants and default values for Docktail

use std::time::Duration;

/// Default output root for container log directories
pub const DEFAULT_LOG_ROOT: &str = "/var/log";

/// Default per-file size limit (human-readable form, parsed at startup)
pub const DEFAULT_LOG_LIMIT: &str = "50MB";

/// Interval between container list polls
pub const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Backoff before retrying a failed container list call
pub const LIST_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Chunk size for the backward tail scan
pub const TAIL_CHUNK_SIZE: u64 = 4 * 1024;

/// Maximum bytes the tail scan will inspect before giving up on
/// finding a line terminator
pub const TAIL_SCAN_WINDOW: u64 = 1024 * 1024;

/// Number of container ID characters shown in log output
pub const SHORT_ID_LEN: usize = 12;

/// Truncate a container ID for log output
pub fn short_id(id: &str) -> &str {
    &id[..id.len().min(SHORT_ID_LEN)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_id_truncates() {
        let id = "0123456789abcdef0123456789abcdef";
        assert_eq!(short_id(id), "0123456789ab");
    }

    #[test]
    fn test_short_id_short_input() {
        assert_eq!(short_id("abc"), "abc");
        assert_eq!(short_id(""), "");
    }
}
