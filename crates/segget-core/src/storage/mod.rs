//! Segment files and final assembly.
//!
//! Each segment streams into its own file, `{file}.{id}.part`, owned by one
//! worker. Merging concatenates them in id order into `{file}.part`, syncs
//! it, and renames it to the final name; segment files are removed only after
//! that rename succeeds.

mod assemble;
mod segment_file;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::segmenter::SegmentId;

pub use assemble::{merge_segments, Merged};
pub use segment_file::{open_fresh, open_resume, SegmentSink};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Failure while assembling the final artifact.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("segment {id} ({path}): {source}")]
    Segment {
        id: SegmentId,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Segment file for `id` of `file_name` inside `dir`.
pub fn segment_path(dir: &Path, file_name: &str, id: SegmentId) -> PathBuf {
    dir.join(format!("{}.{}{}", file_name, id, TEMP_SUFFIX))
}

/// Path for the temp file: appends `.part` to the final path (e.g. `file.iso` → `file.iso.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}
