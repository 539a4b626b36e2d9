//! On-disk document layout of the state record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::descriptor::RangeDescriptor;
use crate::ledger::TerminalState;
use crate::segmenter::SegmentId;

pub(crate) const FORMAT_VERSION: u32 = 1;

/// Whole state file: one record per target file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDocument {
    pub version: u32,
    #[serde(default)]
    pub files: BTreeMap<String, FileRecord>,
}

impl Default for StateDocument {
    fn default() -> Self {
        Self {
            version: FORMAT_VERSION,
            files: BTreeMap::new(),
        }
    }
}

/// Saved progress for one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub url: String,
    pub total_size: u64,
    pub segment_count: u32,
    pub parts: Vec<PartRecord>,
}

impl FileRecord {
    pub fn incomplete(&self) -> impl Iterator<Item = &PartRecord> {
        self.parts
            .iter()
            .filter(|p| p.state == TerminalState::Incomplete)
    }

    pub fn complete_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|p| p.state == TerminalState::Complete)
            .count()
    }
}

/// One segment's terminal state and resume point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartRecord {
    pub id: SegmentId,
    pub state: TerminalState,
    pub range: RangeDescriptor,
}
