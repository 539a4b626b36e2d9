//! Segmented download engine.
//!
//! A [`Coordinator`] plans the segments of a [`Target`] (fresh, or from the
//! state record on resume), runs one [`TransferWorker`] per segment on its own
//! thread, and once every worker has returned either merges the segment files
//! or leaves them on disk with a saved record for a later resume.

mod coordinator;
mod target;
mod worker;

pub use coordinator::{Coordinator, CoordinatorState, DownloadOutcome};
pub use target::Target;
pub use worker::{SegmentOutcome, TransferWorker};
