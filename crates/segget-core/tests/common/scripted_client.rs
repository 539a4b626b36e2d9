//! In-memory `RangeClient` whose per-segment behavior is scripted by range start.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use segget_core::control::StopToken;
use segget_core::fetch::{FetchProgress, NetworkError, RangeClient};
use segget_core::segmenter::ByteRange;

const CHUNK: usize = 25;

#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    /// Deliver the whole range.
    Serve,
    /// Deliver this many bytes, then hold the connection until stop is requested.
    StallAfter(u64),
    /// Deliver this many bytes, then fail with HTTP 503.
    FailAfter(u64),
}

pub struct ScriptedClient {
    body: Vec<u8>,
    script: HashMap<u64, Behavior>,
    requests: Mutex<Vec<(u64, u64)>>,
}

impl ScriptedClient {
    pub fn new(body: Vec<u8>) -> Self {
        Self {
            body,
            script: HashMap::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Use `behavior` for the request whose range starts at `start`.
    pub fn on(mut self, start: u64, behavior: Behavior) -> Self {
        self.script.insert(start, behavior);
        self
    }

    pub fn requested_ranges(&self) -> Vec<(u64, u64)> {
        let mut v = self.requests.lock().unwrap().clone();
        v.sort();
        v
    }

    fn deliver(
        &self,
        bytes: &[u8],
        sink: &mut dyn Write,
        on_progress: &mut dyn FnMut(FetchProgress),
        stop: &StopToken,
    ) -> Result<u64, NetworkError> {
        let mut sent = 0u64;
        for chunk in bytes.chunks(CHUNK) {
            if stop.is_stopped() {
                return Err(NetworkError::Cancelled);
            }
            sink.write_all(chunk).map_err(NetworkError::Sink)?;
            sent += chunk.len() as u64;
            on_progress(FetchProgress {
                transferred: sent,
                expected: Some(bytes.len() as u64),
            });
        }
        Ok(sent)
    }
}

impl RangeClient for ScriptedClient {
    fn probe_length(&self, _url: &str) -> Result<Option<u64>, NetworkError> {
        Ok(Some(self.body.len() as u64))
    }

    fn fetch_range(
        &self,
        _url: &str,
        range: ByteRange,
        sink: &mut dyn Write,
        on_progress: &mut dyn FnMut(FetchProgress),
        stop: &StopToken,
    ) -> Result<u64, NetworkError> {
        self.requests.lock().unwrap().push((range.start, range.end));
        let last = (self.body.len() as u64).saturating_sub(1);
        let end = range.end.min(last);
        if range.start > end {
            return Err(NetworkError::Http(416));
        }
        let slice = &self.body[range.start as usize..=end as usize];

        match self.script.get(&range.start).copied().unwrap_or(Behavior::Serve) {
            Behavior::Serve => self.deliver(slice, sink, on_progress, stop),
            Behavior::StallAfter(n) => {
                let n = (n as usize).min(slice.len());
                self.deliver(&slice[..n], sink, on_progress, stop)?;
                let deadline = Instant::now() + Duration::from_secs(10);
                while !stop.is_stopped() {
                    if Instant::now() > deadline {
                        return Err(NetworkError::Http(504));
                    }
                    thread::sleep(Duration::from_millis(2));
                }
                Err(NetworkError::Cancelled)
            }
            Behavior::FailAfter(n) => {
                let n = (n as usize).min(slice.len());
                self.deliver(&slice[..n], sink, on_progress, stop)?;
                Err(NetworkError::Http(503))
            }
        }
    }
}

/// Poll `cond` every few milliseconds for up to five seconds.
pub fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    false
}
