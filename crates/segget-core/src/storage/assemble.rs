//! Concatenate segment files into the final artifact.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::{segment_path, temp_path, MergeError};

/// The assembled file and the number of bytes written to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Merged {
    pub path: PathBuf,
    pub bytes: u64,
}

/// Merge segments `1..=segment_count` of `file_name` in `dir` into `dir/file_name`.
///
/// The output only appears under its final name once every segment has been
/// copied and synced. On failure the temp file is removed and the segment
/// files are left for another attempt.
pub fn merge_segments(
    dir: &Path,
    file_name: &str,
    segment_count: u32,
) -> Result<Merged, MergeError> {
    let final_path = dir.join(file_name);
    let tmp = temp_path(&final_path);

    let bytes = match write_concatenation(dir, file_name, segment_count, &tmp) {
        Ok(n) => n,
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
    };
    if let Err(source) = fs::rename(&tmp, &final_path) {
        let _ = fs::remove_file(&tmp);
        return Err(MergeError::Output {
            path: final_path,
            source,
        });
    }

    for id in 1..=segment_count {
        let seg = segment_path(dir, file_name, id);
        if let Err(e) = fs::remove_file(&seg) {
            tracing::warn!("could not remove segment file {}: {}", seg.display(), e);
        }
    }
    tracing::info!(path = %final_path.display(), segments = segment_count, bytes, "merged");
    Ok(Merged {
        path: final_path,
        bytes,
    })
}

fn write_concatenation(
    dir: &Path,
    file_name: &str,
    segment_count: u32,
    tmp: &Path,
) -> Result<u64, MergeError> {
    let output_err = |source| MergeError::Output {
        path: tmp.to_path_buf(),
        source,
    };
    let mut out = BufWriter::new(File::create(tmp).map_err(output_err)?);
    let mut written = 0u64;

    for id in 1..=segment_count {
        let path = segment_path(dir, file_name, id);
        let mut seg = File::open(&path).map_err(|source| MergeError::Segment {
            id,
            path: path.clone(),
            source,
        })?;
        written += io::copy(&mut seg, &mut out)
            .map_err(|source| MergeError::Segment { id, path, source })?;
    }

    let file = out.into_inner().map_err(|e| output_err(e.into_error()))?;
    file.sync_all().map_err(output_err)?;
    Ok(written)
}
