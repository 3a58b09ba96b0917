//! Size-bounded rotating log writer

use docktail_core::{Error, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::rotation::RotationConfig;
use crate::{container_log_path, ensure_log_dir};

/// Append-only log sink with size-based rotation.
///
/// Writes are serialized by an internal lock, so interleaved stdout and
/// stderr frames for one container cannot corrupt each other. Rotation
/// moves the active file to the next free `<base>.<N>` (or
/// `<base>.<N>.gz`) sibling and reopens the canonical path; a log line is
/// never split across two files.
pub struct RotatingLogWriter {
    path: PathBuf,
    config: RotationConfig,
    inner: Mutex<Inner>,
}

struct Inner {
    file: Option<File>,
    size: u64,
    closed: bool,
}

impl RotatingLogWriter {
    /// Create a writer for one container's log file under `root`,
    /// creating the directory and opening the active file.
    pub fn new(root: &Path, name: &str, config: RotationConfig) -> Result<Self> {
        ensure_log_dir(root, name)?;
        let writer = Self {
            path: container_log_path(root, name),
            config,
            inner: Mutex::new(Inner {
                file: None,
                size: 0,
                closed: false,
            }),
        };
        {
            let mut inner = writer.inner.lock();
            writer.open_active(&mut inner)?;
        }
        Ok(writer)
    }

    /// Append `buf`, rotating at line boundaries when the size limit
    /// would be exceeded. Returns the number of bytes written.
    pub fn write(&self, buf: &[u8]) -> Result<usize> {
        let mut inner = self.inner.lock();

        if inner.closed {
            return Err(Error::WriterClosed);
        }
        if inner.file.is_none() {
            self.open_active(&mut inner)?;
        }

        let limit = self.config.limit_bytes;

        // Fast path: the whole payload fits, write it as one unit.
        if inner.size + buf.len() as u64 <= limit {
            let file = inner.file.as_mut().ok_or(Error::WriterClosed)?;
            file.write_all(buf)?;
            inner.size += buf.len() as u64;
            return Ok(buf.len());
        }

        // Split at line boundaries; each segment keeps its newline.
        let mut written = 0;
        for segment in buf.split_inclusive(|&b| b == b'\n') {
            let seg_len = segment.len() as u64;

            if seg_len > limit {
                // Rotation cannot help a line larger than the limit;
                // write it whole.
                warn!(
                    path = %self.path.display(),
                    line_size = seg_len,
                    limit,
                    "log line exceeds size limit, writing without rotation"
                );
            } else if inner.size + seg_len > limit {
                self.rotate(&mut inner)?;
            }

            let file = inner.file.as_mut().ok_or(Error::WriterClosed)?;
            file.write_all(segment)?;
            inner.size += seg_len;
            written += segment.len();
        }
        Ok(written)
    }

    /// Close the writer. Idempotent; writes after the first close fail
    /// with [`Error::WriterClosed`].
    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Ok(());
        }
        inner.closed = true;
        if let Some(file) = inner.file.take() {
            file.sync_all()?;
        }
        Ok(())
    }

    /// Canonical path of the active log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes in the active file
    pub fn current_size(&self) -> u64 {
        self.inner.lock().size
    }

    /// Close the active file (if open), move it to the next rotation
    /// index, and reopen the canonical path.
    fn rotate(&self, inner: &mut Inner) -> Result<()> {
        if let Some(file) = inner.file.take() {
            drop(file);

            let index = max_rotation_index(&self.path)? + 1;
            let rotated = rotated_path(&self.path, index);

            if self.config.compress {
                let gz = gz_path(&rotated);
                compress_file(&self.path, &gz)?;
                // The original is only removed once the compressed copy
                // is complete.
                fs::remove_file(&self.path)?;
                debug!(from = %self.path.display(), to = %gz.display(), "rotated log file");
            } else {
                fs::rename(&self.path, &rotated)?;
                debug!(from = %self.path.display(), to = %rotated.display(), "rotated log file");
            }
        }
        self.open_active(inner)
    }

    /// Open (create if absent) the canonical path in append mode and
    /// take the size from the file's actual length.
    fn open_active(&self, inner: &mut Inner) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        inner.size = file.metadata()?.len();
        inner.file = Some(file);
        Ok(())
    }
}

/// Path for a rotated log file: `<base>.<index>`
fn rotated_path(base: &Path, index: u64) -> PathBuf {
    let name = base
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    base.with_file_name(format!("{}.{}", name, index))
}

/// Append `.gz` to a rotated path
fn gz_path(rotated: &Path) -> PathBuf {
    let mut os = rotated.as_os_str().to_os_string();
    os.push(".gz");
    PathBuf::from(os)
}

/// Highest rotation index among existing `<base>.<N>` / `<base>.<N>.gz`
/// siblings, 0 if none.
fn max_rotation_index(path: &Path) -> Result<u64> {
    let dir = path
        .parent()
        .ok_or_else(|| Error::rotation(path, "no parent directory"))?;
    let base = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => format!("{}.", name),
        None => return Err(Error::rotation(path, "invalid file name")),
    };

    let mut max_index = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let file_name = match file_name.to_str() {
            Some(n) => n,
            None => continue,
        };
        if let Some(suffix) = file_name.strip_prefix(&base) {
            let suffix = suffix.strip_suffix(".gz").unwrap_or(suffix);
            if let Ok(index) = suffix.parse::<u64>() {
                max_index = max_index.max(index);
            }
        }
    }
    Ok(max_index)
}

/// Stream-copy `src` through a gzip encoder into `dst`. A partial `dst`
/// is removed on failure; `src` is left untouched.
fn compress_file(src: &Path, dst: &Path) -> Result<()> {
    let result = (|| -> std::io::Result<()> {
        let mut source = File::open(src)?;
        let target = File::create(dst)?;
        let mut encoder = GzEncoder::new(target, Compression::default());
        std::io::copy(&mut source, &mut encoder)?;
        encoder.finish()?;
        Ok(())
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(dst);
        return Err(Error::rotation(
            src,
            format!("gzip to {}: {}", dst.display(), e),
        ));
    }
    Ok(())
}
