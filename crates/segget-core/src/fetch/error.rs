//! Transport error type for probes and segment fetches.

use thiserror::Error;

/// Error returned by the HTTP client for a probe or a single range fetch.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Curl reported an error (timeout, connection, etc.).
    #[error("{0}")]
    Curl(#[from] curl::Error),
    /// HTTP response had a non-2xx status.
    #[error("HTTP {0}")]
    Http(u32),
    /// The server answered a range request with the whole resource.
    #[error("server ignored Range request starting at byte {0}")]
    RangeIgnored(u64),
    /// The stop token was set while the transfer was running.
    #[error("transfer cancelled")]
    Cancelled,
    /// Writing received bytes to the sink failed (disk full, permission denied).
    #[error("sink write failed: {0}")]
    Sink(#[source] std::io::Error),
    /// Transfer ended before the expected number of bytes arrived.
    #[error("partial transfer: expected {expected} bytes, got {received}")]
    PartialTransfer { expected: u64, received: u64 },
}
