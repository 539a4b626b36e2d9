//! HTTP client collaborator: size probe and Range GET.
//!
//! The coordinator only talks to [`RangeClient`]; [`CurlClient`] is the
//! libcurl-backed implementation used by the CLI. Both operations follow
//! redirects.

mod curl_client;
mod error;
mod parse;

use std::io::Write;

use crate::control::StopToken;
use crate::segmenter::ByteRange;

pub use curl_client::{CurlClient, CurlOptions};
pub use error::NetworkError;

/// Progress of one range fetch, reported after each chunk reached the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchProgress {
    /// Bytes written to the sink so far in this fetch.
    pub transferred: u64,
    /// Length announced by the server for this response, if any.
    pub expected: Option<u64>,
}

/// Network operations the coordinator delegates.
pub trait RangeClient: Send + Sync {
    /// Probe the resource size. `Ok(None)` when the server sends no length.
    fn probe_length(&self, url: &str) -> Result<Option<u64>, NetworkError>;

    /// Fetch `range` into `sink`, calling `on_progress` after every chunk.
    ///
    /// Implementations poll `stop` during the transfer and return
    /// [`NetworkError::Cancelled`] once it is set. Returns the number of bytes
    /// written to `sink`.
    fn fetch_range(
        &self,
        url: &str,
        range: ByteRange,
        sink: &mut dyn Write,
        on_progress: &mut dyn FnMut(FetchProgress),
        stop: &StopToken,
    ) -> Result<u64, NetworkError>;
}
