//! Error taxonomy for a download attempt.
//!
//! Only configuration, probe and merge failures are fatal for `download()`.
//! Per-segment failures travel as [`SegmentError`] inside a
//! [`SegmentOutcome`](crate::downloader::SegmentOutcome) and never abort the
//! other segments.

use thiserror::Error;

use crate::fetch::NetworkError;
use crate::state_store::StateError;
use crate::storage::MergeError;

/// Fatal errors surfaced by the coordinator.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Bad segment count, unparseable URL, unknown size, or unusable saved state.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// Metadata probe failed before any segment was planned.
    #[error("probe failed: {0}")]
    Network(#[from] NetworkError),
    /// The state record could not be read at resume time.
    #[error("state record: {0}")]
    Persistence(#[from] StateError),
    /// Assembly of the final artifact failed; segment files are left in place.
    #[error("merge failed: {0}")]
    Merge(#[from] MergeError),
}

impl DownloadError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        DownloadError::InvalidConfiguration(msg.into())
    }
}

/// Reason a segment ended `incomplete`.
#[derive(Debug, Error)]
pub enum SegmentError {
    /// Transport failure reported by the HTTP client.
    #[error(transparent)]
    Network(NetworkError),
    /// The segment file could not be opened or prepared.
    #[error("segment file: {0}")]
    Storage(#[from] std::io::Error),
    /// The segment file holds fewer bytes than the state record promises.
    #[error("segment file holds {found} bytes, state record expects {expected}")]
    SegmentFileMismatch { expected: u64, found: u64 },
    /// Stop was requested while the transfer was in flight.
    #[error("cancelled")]
    Cancelled,
}

impl From<NetworkError> for SegmentError {
    fn from(e: NetworkError) -> Self {
        match e {
            NetworkError::Cancelled => SegmentError::Cancelled,
            other => SegmentError::Network(other),
        }
    }
}
