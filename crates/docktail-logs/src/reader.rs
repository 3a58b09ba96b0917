//! Tail reading for resume-point determination

use docktail_core::{Result, TAIL_CHUNK_SIZE, TAIL_SCAN_WINDOW};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

/// Read the last complete line of a file, excluding its terminator.
///
/// Scans backward from the end in fixed-size chunks. A single trailing
/// newline at end of file is skipped, so a file ending in `\n` still
/// yields the content of its final line. Returns the empty string for an
/// empty file. The scan is bounded: if no terminator is found within the
/// window, the window content is returned as a best-effort line.
pub fn last_line(file: &mut File) -> Result<String> {
    last_line_bounded(file, TAIL_CHUNK_SIZE, TAIL_SCAN_WINDOW)
}

fn last_line_bounded(file: &mut File, chunk_size: u64, window: u64) -> Result<String> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(String::new());
    }

    // Bytes collected so far, always ending at true EOF.
    let mut collected: Vec<u8> = Vec::new();
    let mut position = len;
    let mut scanned: u64 = 0;

    while position > 0 && scanned < window {
        let read_size = chunk_size.min(position).min(window - scanned);
        position -= read_size;
        scanned += read_size;

        file.seek(SeekFrom::Start(position))?;
        let mut buffer = vec![0u8; read_size as usize];
        file.read_exact(&mut buffer)?;

        buffer.extend_from_slice(&collected);
        collected = buffer;

        let end = line_end(&collected);
        if let Some(nl) = collected[..end].iter().rposition(|&b| b == b'\n') {
            return Ok(String::from_utf8_lossy(&collected[nl + 1..end]).into_owned());
        }
        if position == 0 {
            // Reached start of file without a terminator: the whole
            // file is one line.
            return Ok(String::from_utf8_lossy(&collected[..end]).into_owned());
        }
    }

    // Window exhausted with no terminator; best-effort result.
    let end = line_end(&collected);
    Ok(String::from_utf8_lossy(&collected[..end]).into_owned())
}

/// End of line content within `tail`, excluding one trailing newline
/// if the file ends with one.
fn line_end(tail: &[u8]) -> usize {
    match tail.last() {
        Some(b'\n') => tail.len() - 1,
        _ => tail.len(),
    }
}
