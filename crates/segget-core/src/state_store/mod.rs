//! Durable, human-readable state record keyed by target file name.
//!
//! The record lives in one pretty-printed JSON document
//! (`~/.local/state/segget/state.json` by default). Each write replaces the
//! whole record of one file name and leaves other file names untouched; the
//! document is written to a sibling temp file and renamed into place.

mod descriptor;
mod record;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

use crate::downloader::Target;
use crate::ledger::{LedgerSnapshot, TerminalState};
use crate::segmenter::Segment;

pub use descriptor::{resume_descriptor, AttemptPlan, RangeDescriptor};
pub use record::{FileRecord, PartRecord, StateDocument};

/// Failure to read or write the state record.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{path}: malformed state record: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not encode state record: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("no usable state directory: {0}")]
    Location(String),
}

/// Handle to the state file. Clones share one in-process write lock.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
    guard: Arc<Mutex<()>>,
}

impl StateStore {
    /// Store at `$XDG_STATE_HOME/segget/state.json`.
    pub fn open_default() -> Result<Self, StateError> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("segget")
            .map_err(|e| StateError::Location(e.to_string()))?;
        let path = xdg_dirs
            .place_state_file("state.json")
            .map_err(|source| StateError::Io {
                path: xdg_dirs.get_state_home(),
                source,
            })?;
        Ok(Self::at(path))
    }

    /// Store backed by an explicit file (created on first write).
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Segments recorded as `incomplete` for `file_name`, each restarting at
    /// its recorded resume point. Empty when there is no record.
    pub fn load_incomplete(&self, file_name: &str) -> Result<Vec<Segment>, StateError> {
        let Some(rec) = self.record(file_name)? else {
            return Ok(Vec::new());
        };
        let mut out: Vec<Segment> = rec
            .incomplete()
            .map(|p| Segment::resumed(p.id, p.range.start, p.range.end))
            .collect();
        out.sort_by_key(|s| s.id);
        Ok(out)
    }

    /// The saved record for `file_name`, if any.
    pub fn record(&self, file_name: &str) -> Result<Option<FileRecord>, StateError> {
        let _g = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read_document()?.files.remove(file_name))
    }

    pub fn has_record(&self, file_name: &str) -> Result<bool, StateError> {
        Ok(self.record(file_name)?.is_some())
    }

    /// Every saved record, ordered by file name.
    pub fn list(&self) -> Result<Vec<(String, FileRecord)>, StateError> {
        let _g = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read_document()?.files.into_iter().collect())
    }

    /// Replace the record of `target` with the resume points in `snapshot`.
    ///
    /// Entries that never reached a terminal state are written as
    /// `incomplete`. On a resumed attempt, segments finished earlier and
    /// absent from this snapshot stay `complete`.
    pub fn persist(
        &self,
        target: &Target,
        snapshot: &LedgerSnapshot,
        plan: &AttemptPlan,
    ) -> Result<(), StateError> {
        let _g = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        let mut doc = self.read_document()?;

        let mut parts: Vec<PartRecord> = snapshot
            .entries
            .iter()
            .map(|e| {
                let state = e.state.terminal().unwrap_or(TerminalState::Incomplete);
                PartRecord {
                    id: e.id,
                    state,
                    range: resume_descriptor(e, state, plan),
                }
            })
            .collect();

        if let Some(prev) = doc.files.get(&target.file_name) {
            if plan.is_resume && prev.total_size == target.total_size {
                parts.extend(prev.parts.iter().filter(|p| {
                    p.state == TerminalState::Complete && snapshot.get(p.id).is_none()
                }));
            }
        }
        parts.sort_by_key(|p| p.id);

        let incomplete = parts
            .iter()
            .filter(|p| p.state == TerminalState::Incomplete)
            .count();
        doc.files.insert(
            target.file_name.clone(),
            FileRecord {
                url: target.url.clone(),
                total_size: target.total_size,
                segment_count: target.segment_count,
                parts,
            },
        );
        self.write_document(&doc)?;
        tracing::info!(
            file = %target.file_name,
            incomplete,
            path = %self.path.display(),
            "state record saved"
        );
        Ok(())
    }

    /// Drop the record of `file_name`. Returns whether one existed.
    pub fn forget(&self, file_name: &str) -> Result<bool, StateError> {
        let _g = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        let mut doc = self.read_document()?;
        if doc.files.remove(file_name).is_none() {
            return Ok(false);
        }
        self.write_document(&doc)?;
        tracing::debug!(file = %file_name, "state record removed");
        Ok(true)
    }

    fn read_document(&self) -> Result<StateDocument, StateError> {
        let data = match fs::read_to_string(&self.path) {
            Ok(d) => d,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(StateDocument::default()),
            Err(source) => {
                return Err(StateError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if data.trim().is_empty() {
            return Ok(StateDocument::default());
        }
        serde_json::from_str(&data).map_err(|source| StateError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    fn write_document(&self, doc: &StateDocument) -> Result<(), StateError> {
        let io_err = |source| StateError::Io {
            path: self.path.clone(),
            source,
        };
        let mut body = serde_json::to_string_pretty(doc).map_err(StateError::Serialize)?;
        body.push('\n');
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, body).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)
    }
}
