//! One segment's transfer: open its file, fetch its range, report to the ledger.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use crate::control::StopToken;
use crate::error::SegmentError;
use crate::fetch::{FetchProgress, NetworkError, RangeClient};
use crate::ledger::{ProgressLedger, SegmentState, TerminalState};
use crate::segmenter::{planned_start, Segment, SegmentId};
use crate::storage::{open_fresh, open_resume, segment_path, SegmentSink};

/// How a worker ended. The ledger holds the same verdict.
#[derive(Debug)]
pub enum SegmentOutcome {
    Completed { bytes: u64 },
    Incomplete(SegmentError),
}

impl SegmentOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, SegmentOutcome::Completed { .. })
    }
}

/// Everything a worker thread needs; cheap to clone per segment.
pub struct TransferWorker<C: RangeClient + ?Sized> {
    pub(crate) client: Arc<C>,
    pub(crate) ledger: Arc<ProgressLedger>,
    pub(crate) stop: StopToken,
    pub(crate) url: String,
    pub(crate) dir: PathBuf,
    pub(crate) file_name: String,
    pub(crate) total_size: u64,
    pub(crate) partition_size: u64,
    pub(crate) segment_count: u32,
}

impl<C: RangeClient + ?Sized> Clone for TransferWorker<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            ledger: Arc::clone(&self.ledger),
            stop: self.stop.clone(),
            url: self.url.clone(),
            dir: self.dir.clone(),
            file_name: self.file_name.clone(),
            total_size: self.total_size,
            partition_size: self.partition_size,
            segment_count: self.segment_count,
        }
    }
}

impl<C: RangeClient + ?Sized> TransferWorker<C> {
    /// Transfer `segment` and report exactly one terminal state for it.
    pub fn run(&self, segment: Segment) -> SegmentOutcome {
        let id = segment.id;
        self.ledger.mark_started(id);
        tracing::debug!(
            segment = id,
            start = segment.range.start,
            end = segment.range.end,
            "segment started"
        );

        match self.transfer(segment) {
            Ok(bytes) => {
                self.ledger.report_terminal(id, TerminalState::Complete);
                tracing::debug!(segment = id, bytes, "segment complete");
                SegmentOutcome::Completed { bytes }
            }
            Err(err) => {
                self.ledger.report_terminal(id, TerminalState::Incomplete);
                // An early completion report from the progress callback wins.
                if self.ledger.state_of(id) == Some(SegmentState::Complete) {
                    let bytes = self.transferred(id);
                    tracing::debug!(segment = id, "late error after completion ignored: {}", err);
                    return SegmentOutcome::Completed { bytes };
                }
                match err {
                    SegmentError::Cancelled => tracing::debug!(segment = id, "segment paused"),
                    ref e => tracing::warn!(segment = id, "segment incomplete: {}", e),
                }
                SegmentOutcome::Incomplete(err)
            }
        }
    }

    fn transferred(&self, id: SegmentId) -> u64 {
        self.ledger
            .snapshot()
            .get(id)
            .map(|e| e.transferred)
            .unwrap_or(0)
    }

    /// Open the segment file positioned for `segment.range` and wrap it so
    /// only bytes from the segment's own planned span reach the file.
    ///
    /// A saved range may start before the planned origin or end past the
    /// planned end; the range is still fetched as saved and the surplus is
    /// dropped at the sink. The last segment has no planned end.
    fn open_segment_sink(&self, segment: &Segment) -> Result<SegmentSink<File>, SegmentError> {
        let path = segment_path(&self.dir, &self.file_name, segment.id);
        let origin = planned_start(segment.id, self.partition_size);
        let start = segment.range.start;
        let confirmed = start.saturating_sub(origin);
        let file = if confirmed == 0 {
            open_fresh(&path)?
        } else {
            open_resume(&path, confirmed)?
        };

        let skip = origin.saturating_sub(start);
        let keep = (segment.id < self.segment_count).then(|| {
            let planned_end = segment.id as u64 * self.partition_size;
            (planned_end + 1).saturating_sub(start.max(origin))
        });
        if skip > 0 || keep.map_or(false, |k| k < segment.range.len()) {
            tracing::debug!(
                segment = segment.id,
                start,
                end = segment.range.end,
                skip,
                ?keep,
                "saved range reaches outside the planned segment; trimming at the sink"
            );
        }
        Ok(SegmentSink::new(file, skip, keep))
    }

    fn transfer(&self, segment: Segment) -> Result<u64, SegmentError> {
        let id = segment.id;
        let mut sink = self.open_segment_sink(&segment)?;

        let expected = segment.range.len_within(self.total_size);
        if expected == 0 {
            return Ok(0);
        }
        if self.stop.is_stopped() {
            return Err(SegmentError::Cancelled);
        }

        let ledger = &self.ledger;
        let mut reported = false;
        let mut on_progress = |p: FetchProgress| {
            ledger.record_progress(id, p.transferred);
            if !reported && p.transferred >= expected {
                reported = true;
                ledger.report_terminal(id, TerminalState::Complete);
            }
        };
        let received = self.client.fetch_range(
            &self.url,
            segment.range,
            &mut sink,
            &mut on_progress,
            &self.stop,
        )?;
        sink.flush()?;

        if received < expected {
            return Err(NetworkError::PartialTransfer { expected, received }.into());
        }
        Ok(received)
    }
}
