//! Stop token shared between the coordinator, its workers and the HTTP client.
//!
//! `interrupt()` sets the token; the HTTP client polls it from inside its
//! transfer callbacks and aborts the in-flight request. Cancellation is
//! cooperative: a worker observes the stop at its next callback, which libcurl
//! issues at least about once per second even on an idle connection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable handle to a single stop flag.
#[derive(Debug, Clone, Default)]
pub struct StopToken {
    flag: Arc<AtomicBool>,
}

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that every transfer holding this token stops at its next callback.
    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Clear a previous stop so the token can drive a new attempt.
    pub(crate) fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
