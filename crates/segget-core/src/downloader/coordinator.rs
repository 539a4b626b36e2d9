//! Planning, worker fan-out, and the merge-or-pause decision for one target.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use crate::control::StopToken;
use crate::error::{DownloadError, SegmentError};
use crate::fetch::RangeClient;
use crate::ledger::{FlushStatus, LedgerSnapshot, ProgressLedger, ProgressStats, TerminalState};
use crate::segmenter::{plan_segments, RangePolicy, Segment, SegmentId};
use crate::state_store::{AttemptPlan, StateStore};
use crate::storage::{merge_segments, Merged};

use super::target::Target;
use super::worker::{SegmentOutcome, TransferWorker};

/// Where the coordinator is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Planning,
    Transferring,
    Merging,
    Done,
    /// Stopped or left with incomplete segments; the state record allows a resume.
    Paused,
}

/// Result of one `download()` / `reinstate()` call.
#[derive(Debug)]
pub enum DownloadOutcome {
    /// Every segment completed and the merged file is in place.
    Completed { path: PathBuf, bytes: u64 },
    /// Stop was requested; `incomplete` lists segments still to fetch.
    Paused {
        incomplete: Vec<SegmentId>,
        state_saved: bool,
    },
    /// Some segments failed without a stop request.
    Incomplete {
        failed: Vec<(SegmentId, SegmentError)>,
        state_saved: bool,
    },
}

/// Drives one target through plan, transfer, and merge or pause.
///
/// All methods take `&self`, so a caller can share the coordinator (e.g. in
/// an `Arc`) and call [`interrupt`](Self::interrupt) or
/// [`progress`](Self::progress) while a download runs on another thread.
pub struct Coordinator<C: RangeClient + 'static> {
    target: Target,
    client: Arc<C>,
    store: StateStore,
    download_dir: PathBuf,
    policy: RangePolicy,
    stop: StopToken,
    state: Mutex<CoordinatorState>,
    ledger: Mutex<Option<Arc<ProgressLedger>>>,
}

struct Attempt {
    segments: Vec<Segment>,
    plan: AttemptPlan,
    base_bytes: u64,
}

impl<C: RangeClient + 'static> Coordinator<C> {
    pub fn new(
        target: Target,
        client: Arc<C>,
        store: StateStore,
        download_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            target,
            client,
            store,
            download_dir: download_dir.into(),
            policy: RangePolicy::default(),
            stop: StopToken::new(),
            state: Mutex::new(CoordinatorState::Idle),
            ledger: Mutex::new(None),
        }
    }

    pub fn with_policy(mut self, policy: RangePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn state(&self) -> CoordinatorState {
        *lock(&self.state)
    }

    /// Ask every running worker to stop at its next transfer callback.
    ///
    /// Ordered against the start of a run by the state lock: a stop issued
    /// once the coordinator has left `Idle` is never cleared by that run.
    pub fn interrupt(&self) {
        let _state = lock(&self.state);
        tracing::info!(file = %self.target.file_name, "interrupt requested");
        self.stop.request_stop();
    }

    /// Progress of the running (or last) attempt.
    pub fn progress(&self) -> Option<ProgressStats> {
        lock(&self.ledger).as_ref().map(|l| l.stats())
    }

    /// Fresh download: plan every segment from scratch.
    pub fn download(&self) -> Result<DownloadOutcome, DownloadError> {
        self.run(false)
    }

    /// Continue from the state record: fetch only segments saved as incomplete.
    pub fn reinstate(&self) -> Result<DownloadOutcome, DownloadError> {
        self.run(true)
    }

    fn run(&self, resume: bool) -> Result<DownloadOutcome, DownloadError> {
        {
            let mut state = lock(&self.state);
            if matches!(
                *state,
                CoordinatorState::Planning | CoordinatorState::Transferring | CoordinatorState::Merging
            ) {
                return Err(DownloadError::invalid(format!(
                    "download of {} is already running",
                    self.target.file_name
                )));
            }
            // A stop from an earlier attempt must not leak into this one.
            self.stop.reset();
            *state = CoordinatorState::Planning;
        }

        let result = self.run_attempt(resume);
        if result.is_err() {
            self.set_state(CoordinatorState::Idle);
        }
        result
    }

    fn run_attempt(&self, resume: bool) -> Result<DownloadOutcome, DownloadError> {
        let attempt = if resume {
            self.plan_resume()?
        } else {
            self.plan_fresh()?
        };

        if attempt.segments.is_empty() {
            tracing::info!(file = %self.target.file_name, "all segments already complete");
            *lock(&self.ledger) = None;
            if self.stop.is_stopped() {
                self.set_state(CoordinatorState::Paused);
                return Ok(DownloadOutcome::Paused {
                    incomplete: Vec::new(),
                    state_saved: true,
                });
            }
            return self.merge();
        }

        let ledger = Arc::new(self.ledger_for(&attempt));
        *lock(&self.ledger) = Some(Arc::clone(&ledger));
        self.set_state(CoordinatorState::Transferring);
        tracing::info!(
            file = %self.target.file_name,
            segments = attempt.segments.len(),
            resume,
            "transfer started"
        );

        let outcomes = self.transfer_all(&ledger, &attempt.segments);

        let state_saved = ledger.flush_status() == FlushStatus::Saved;
        if !state_saved {
            tracing::warn!(
                file = %self.target.file_name,
                status = ?ledger.flush_status(),
                "state record not saved; this attempt cannot be resumed"
            );
        }

        if !self.stop.is_stopped() && ledger.all_complete() {
            return self.merge();
        }

        self.set_state(CoordinatorState::Paused);
        if self.stop.is_stopped() {
            let incomplete: Vec<SegmentId> = outcomes
                .iter()
                .filter(|(_, o)| !o.is_complete())
                .map(|(id, _)| *id)
                .collect();
            tracing::info!(file = %self.target.file_name, ?incomplete, "paused");
            return Ok(DownloadOutcome::Paused {
                incomplete,
                state_saved,
            });
        }
        let failed: Vec<(SegmentId, SegmentError)> = outcomes
            .into_iter()
            .filter_map(|(id, o)| match o {
                SegmentOutcome::Incomplete(e) => Some((id, e)),
                SegmentOutcome::Completed { .. } => None,
            })
            .collect();
        tracing::warn!(
            file = %self.target.file_name,
            failed = failed.len(),
            "download incomplete"
        );
        Ok(DownloadOutcome::Incomplete {
            failed,
            state_saved,
        })
    }

    fn plan_fresh(&self) -> Result<Attempt, DownloadError> {
        let segments = plan_segments(self.target.total_size, self.target.segment_count, self.policy)?;
        Ok(Attempt {
            segments,
            plan: AttemptPlan {
                partition_size: self.target.partition_size(),
                is_resume: false,
                last_confirmed: BTreeMap::new(),
            },
            base_bytes: 0,
        })
    }

    fn plan_resume(&self) -> Result<Attempt, DownloadError> {
        let file_name = &self.target.file_name;
        let record = self.store.record(file_name)?.ok_or_else(|| {
            DownloadError::invalid(format!("no saved state for {}", file_name))
        })?;
        if record.total_size != self.target.total_size
            || record.segment_count != self.target.segment_count
        {
            return Err(DownloadError::invalid(format!(
                "saved state for {} is for {} bytes in {} segments, target is {} bytes in {}",
                file_name,
                record.total_size,
                record.segment_count,
                self.target.total_size,
                self.target.segment_count
            )));
        }

        let segments = self.store.load_incomplete(file_name)?;
        let remaining: u64 = segments
            .iter()
            .map(|s| s.range.len_within(self.target.total_size))
            .sum();
        let last_confirmed = segments.iter().map(|s| (s.id, s.resume_offset)).collect();
        tracing::debug!(
            file = %file_name,
            incomplete = segments.len(),
            complete = record.complete_count(),
            "resuming from state record"
        );
        Ok(Attempt {
            segments,
            plan: AttemptPlan {
                partition_size: self.target.partition_size(),
                is_resume: true,
                last_confirmed,
            },
            base_bytes: self.target.total_size.saturating_sub(remaining),
        })
    }

    fn ledger_for(&self, attempt: &Attempt) -> ProgressLedger {
        let store = self.store.clone();
        let target = self.target.clone();
        let plan = attempt.plan.clone();
        ProgressLedger::new(&attempt.segments, self.target.total_size, attempt.base_bytes)
            .with_flush(Box::new(move |snapshot: &LedgerSnapshot| {
                store.persist(&target, snapshot, &plan)
            }))
    }

    /// One thread per segment; blocks until every worker returns.
    fn transfer_all(
        &self,
        ledger: &Arc<ProgressLedger>,
        segments: &[Segment],
    ) -> Vec<(SegmentId, SegmentOutcome)> {
        let worker = TransferWorker {
            client: Arc::clone(&self.client),
            ledger: Arc::clone(ledger),
            stop: self.stop.clone(),
            url: self.target.url.clone(),
            dir: self.download_dir.clone(),
            file_name: self.target.file_name.clone(),
            total_size: self.target.total_size,
            partition_size: self.target.partition_size(),
            segment_count: self.target.segment_count,
        };

        let mut handles = Vec::with_capacity(segments.len());
        let mut outcomes = Vec::with_capacity(segments.len());
        for &segment in segments {
            let w = worker.clone();
            let spawned = thread::Builder::new()
                .name(format!("segget-seg-{}", segment.id))
                .spawn(move || w.run(segment));
            match spawned {
                Ok(h) => handles.push((segment.id, h)),
                Err(e) => {
                    tracing::error!(segment = segment.id, "could not spawn worker: {}", e);
                    ledger.report_terminal(segment.id, TerminalState::Incomplete);
                    outcomes.push((segment.id, SegmentOutcome::Incomplete(SegmentError::Storage(e))));
                }
            }
        }

        for (id, h) in handles {
            let outcome = match h.join() {
                Ok(o) => o,
                Err(_) => {
                    tracing::error!(segment = id, "worker panicked");
                    ledger.report_terminal(id, TerminalState::Incomplete);
                    SegmentOutcome::Incomplete(SegmentError::Storage(std::io::Error::new(
                        std::io::ErrorKind::Other,
                        "worker panicked",
                    )))
                }
            };
            outcomes.push((id, outcome));
        }
        outcomes.sort_by_key(|(id, _)| *id);
        outcomes
    }

    fn merge(&self) -> Result<DownloadOutcome, DownloadError> {
        self.set_state(CoordinatorState::Merging);
        let file_name = &self.target.file_name;
        tracing::info!(file = %file_name, segments = self.target.segment_count, "merging");
        let Merged { path, bytes } =
            merge_segments(&self.download_dir, file_name, self.target.segment_count)?;
        if let Err(e) = self.store.forget(file_name) {
            tracing::warn!(file = %file_name, "could not clear state record: {}", e);
        }
        self.set_state(CoordinatorState::Done);
        tracing::info!(file = %file_name, bytes, "download complete");
        Ok(DownloadOutcome::Completed { path, bytes })
    }

    fn set_state(&self, next: CoordinatorState) {
        let mut state = lock(&self.state);
        tracing::debug!(file = %self.target.file_name, from = ?*state, to = ?next, "state change");
        *state = next;
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
