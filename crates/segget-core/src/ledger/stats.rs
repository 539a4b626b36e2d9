//! Progress figures derived from a ledger (bytes done, rate, ETA).

/// Snapshot of download progress for one attempt (CLI-friendly).
#[derive(Debug, Clone)]
pub struct ProgressStats {
    /// Bytes on disk: carried over from earlier attempts plus this attempt.
    pub bytes_done: u64,
    /// Bytes the finished file will hold.
    pub total_bytes: u64,
    /// Seconds since the ledger was created.
    pub elapsed_secs: f64,
    /// Bytes written during this attempt only.
    pub bytes_this_attempt: u64,
    pub segments_done: usize,
    pub segment_count: usize,
}

impl ProgressStats {
    /// Rate of this attempt in bytes per second (0 if elapsed is 0).
    pub fn bytes_per_sec(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.bytes_this_attempt as f64 / self.elapsed_secs
    }

    /// Estimated seconds remaining (None if the rate is 0).
    pub fn eta_secs(&self) -> Option<f64> {
        let remaining = self.total_bytes.saturating_sub(self.bytes_done);
        if remaining == 0 {
            return Some(0.0);
        }
        let rate = self.bytes_per_sec();
        if rate <= 0.0 {
            return None;
        }
        Some(remaining as f64 / rate)
    }

    /// Fraction complete in [0.0, 1.0].
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return 1.0;
        }
        (self.bytes_done as f64 / self.total_bytes as f64).min(1.0)
    }
}
