//! Opening a segment's file for a fresh or resumed transfer.

use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::SegmentError;

/// Create (or truncate) the segment file for a fresh transfer.
pub fn open_fresh(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
}

/// Open the segment file for appending after `expected_len` confirmed bytes.
///
/// Bytes past `expected_len` were written after the last saved resume point
/// and are cut off. A missing or shorter file cannot be continued.
pub fn open_resume(path: &Path, expected_len: u64) -> Result<File, SegmentError> {
    let mut file = match OpenOptions::new().write(true).open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(SegmentError::SegmentFileMismatch {
                expected: expected_len,
                found: 0,
            })
        }
        Err(e) => return Err(e.into()),
    };
    let found = file.metadata()?.len();
    if found < expected_len {
        return Err(SegmentError::SegmentFileMismatch {
            expected: expected_len,
            found,
        });
    }
    if found > expected_len {
        tracing::debug!(
            path = %path.display(),
            found,
            expected_len,
            "truncating segment file to saved resume point"
        );
        file.set_len(expected_len)?;
    }
    file.seek(SeekFrom::Start(expected_len))?;
    Ok(file)
}

/// Segment file behind a byte window over the fetched range.
///
/// The first `skip` bytes of the response and everything after `keep` bytes
/// are acknowledged but not written, so the file only ever holds the
/// segment's own bytes even when the requested range reaches past them.
pub struct SegmentSink<W> {
    inner: W,
    skip: u64,
    keep: Option<u64>,
}

impl<W: Write> SegmentSink<W> {
    pub fn new(inner: W, skip: u64, keep: Option<u64>) -> Self {
        Self { inner, skip, keep }
    }
}

impl<W: Write> Write for SegmentSink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut data = buf;
        if self.skip > 0 {
            let n = self.skip.min(data.len() as u64) as usize;
            self.skip -= n as u64;
            data = &data[n..];
        }
        if let Some(keep) = self.keep.as_mut() {
            let n = (*keep).min(data.len() as u64) as usize;
            *keep -= n as u64;
            data = &data[..n];
        }
        self.inner.write_all(data)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
