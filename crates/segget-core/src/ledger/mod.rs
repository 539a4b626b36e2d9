//! Shared per-segment progress and terminal state for one attempt.
//!
//! Workers report into the ledger by segment id. The ledger counts segments
//! that have not reached a terminal state; the report that takes the count to
//! zero runs the flush hook exactly once, with a snapshot taken under the same
//! lock as the decrement. The hook itself runs outside the lock.

mod stats;

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::segmenter::{Segment, SegmentId};
use crate::state_store::StateError;

pub use stats::ProgressStats;

/// Terminal state of a segment, as persisted in the state record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalState {
    Complete,
    Incomplete,
}

/// Lifecycle of a segment within one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentState {
    Pending,
    InProgress,
    Complete,
    Incomplete,
}

impl SegmentState {
    pub fn terminal(self) -> Option<TerminalState> {
        match self {
            SegmentState::Complete => Some(TerminalState::Complete),
            SegmentState::Incomplete => Some(TerminalState::Incomplete),
            SegmentState::Pending | SegmentState::InProgress => None,
        }
    }
}

impl From<TerminalState> for SegmentState {
    fn from(t: TerminalState) -> Self {
        match t {
            TerminalState::Complete => SegmentState::Complete,
            TerminalState::Incomplete => SegmentState::Incomplete,
        }
    }
}

/// One segment's view in a [`LedgerSnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerEntry {
    pub id: SegmentId,
    /// End of the range this attempt fetches (inclusive).
    pub end: u64,
    /// Bytes written in the current attempt (not cumulative across resumes).
    pub transferred: u64,
    pub state: SegmentState,
}

/// Point-in-time copy of the ledger, ordered by segment id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub entries: Vec<LedgerEntry>,
}

impl LedgerSnapshot {
    pub fn get(&self, id: SegmentId) -> Option<&LedgerEntry> {
        self.entries.iter().find(|e| e.id == id)
    }
}

/// Hook run once when the last outstanding segment reaches a terminal state.
pub type FlushFn = Box<dyn FnOnce(&LedgerSnapshot) -> Result<(), StateError> + Send>;

/// Result of the drain-time flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushStatus {
    /// No flush has run yet (segments outstanding, or no hook installed).
    Pending,
    Saved,
    Failed(String),
}

/// What a [`ProgressLedger::report_terminal`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalReport {
    /// First terminal report for this id; `outstanding` segments remain.
    Recorded { outstanding: usize },
    /// First report for this id and it was the last outstanding one; the flush ran.
    Drained,
    /// The id already had a terminal state; nothing changed.
    AlreadyTerminal(TerminalState),
    /// The id is not part of this attempt.
    Unknown,
}

struct LedgerInner {
    entries: BTreeMap<SegmentId, LedgerEntry>,
    outstanding: usize,
    on_drained: Option<FlushFn>,
    flush: FlushStatus,
}

/// Thread-safe progress ledger shared by all workers of one attempt.
pub struct ProgressLedger {
    inner: Mutex<LedgerInner>,
    started: Instant,
    /// Bytes the attempt will hold on disk when every segment completes.
    total_bytes: u64,
    /// Bytes already on disk from earlier attempts.
    base_bytes: u64,
}

impl ProgressLedger {
    /// New ledger tracking `segments`, all `Pending` with 0 bytes transferred.
    pub fn new(segments: &[Segment], total_bytes: u64, base_bytes: u64) -> Self {
        let entries: BTreeMap<SegmentId, LedgerEntry> = segments
            .iter()
            .map(|s| {
                (
                    s.id,
                    LedgerEntry {
                        id: s.id,
                        end: s.range.end,
                        transferred: 0,
                        state: SegmentState::Pending,
                    },
                )
            })
            .collect();
        let outstanding = entries.len();
        Self {
            inner: Mutex::new(LedgerInner {
                entries,
                outstanding,
                on_drained: None,
                flush: FlushStatus::Pending,
            }),
            started: Instant::now(),
            total_bytes,
            base_bytes,
        }
    }

    /// Install the hook that persists the snapshot when the attempt drains.
    pub fn with_flush(self, flush: FlushFn) -> Self {
        self.lock().on_drained = Some(flush);
        self
    }

    // Every mutation leaves the map consistent, so a panic in another
    // worker's critical section does not invalidate the data.
    fn lock(&self) -> MutexGuard<'_, LedgerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark `id` as in progress and reset its attempt counter to 0.
    pub fn mark_started(&self, id: SegmentId) {
        let mut inner = self.lock();
        if let Some(e) = inner.entries.get_mut(&id) {
            if e.state == SegmentState::Pending {
                e.state = SegmentState::InProgress;
                e.transferred = 0;
            }
        }
    }

    /// Record bytes written so far in this attempt. Ignored once `id` is terminal.
    pub fn record_progress(&self, id: SegmentId, transferred: u64) {
        let mut inner = self.lock();
        if let Some(e) = inner.entries.get_mut(&id) {
            if e.state.terminal().is_none() {
                e.transferred = transferred;
            }
        }
    }

    /// Report the terminal state of `id`. First writer wins; the outstanding
    /// count drops at most once per id, and the drain flush runs at most once.
    pub fn report_terminal(&self, id: SegmentId, state: TerminalState) -> TerminalReport {
        let (flush, snapshot) = {
            let mut inner = self.lock();
            let Some(entry) = inner.entries.get_mut(&id) else {
                return TerminalReport::Unknown;
            };
            if let Some(existing) = entry.state.terminal() {
                return TerminalReport::AlreadyTerminal(existing);
            }
            entry.state = state.into();
            inner.outstanding -= 1;
            tracing::debug!(segment = id, ?state, outstanding = inner.outstanding, "terminal report");
            if inner.outstanding > 0 {
                return TerminalReport::Recorded {
                    outstanding: inner.outstanding,
                };
            }
            let snapshot = snapshot_of(&inner);
            (inner.on_drained.take(), snapshot)
        };

        if let Some(flush) = flush {
            let status = match flush(&snapshot) {
                Ok(()) => FlushStatus::Saved,
                Err(e) => {
                    tracing::warn!("state flush failed: {}", e);
                    FlushStatus::Failed(e.to_string())
                }
            };
            self.lock().flush = status;
        }
        TerminalReport::Drained
    }

    /// Current state of `id`, if tracked.
    pub fn state_of(&self, id: SegmentId) -> Option<SegmentState> {
        self.lock().entries.get(&id).map(|e| e.state)
    }

    pub fn outstanding(&self) -> usize {
        self.lock().outstanding
    }

    /// True when every tracked segment is `Complete`.
    pub fn all_complete(&self) -> bool {
        self.lock()
            .entries
            .values()
            .all(|e| e.state == SegmentState::Complete)
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        snapshot_of(&self.lock())
    }

    pub fn flush_status(&self) -> FlushStatus {
        self.lock().flush.clone()
    }

    /// Progress figures for display.
    pub fn stats(&self) -> ProgressStats {
        let inner = self.lock();
        let transferred: u64 = inner.entries.values().map(|e| e.transferred).sum();
        let segments_done = inner
            .entries
            .values()
            .filter(|e| e.state == SegmentState::Complete)
            .count();
        ProgressStats {
            bytes_done: (self.base_bytes + transferred).min(self.total_bytes),
            total_bytes: self.total_bytes,
            elapsed_secs: self.started.elapsed().as_secs_f64(),
            bytes_this_attempt: transferred,
            segments_done,
            segment_count: inner.entries.len(),
        }
    }
}

fn snapshot_of(inner: &LedgerInner) -> LedgerSnapshot {
    LedgerSnapshot {
        entries: inner.entries.values().copied().collect(),
    }
}
