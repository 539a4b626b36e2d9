pub mod config;
pub mod logging;

pub mod control;
pub mod downloader;
pub mod error;
pub mod fetch;
pub mod ledger;
pub mod segmenter;
pub mod state_store;
pub mod storage;
pub mod url_model;

pub use control::StopToken;
pub use downloader::{Coordinator, CoordinatorState, DownloadOutcome, Target};
pub use error::{DownloadError, SegmentError};
