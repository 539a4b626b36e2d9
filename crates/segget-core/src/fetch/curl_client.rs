//! libcurl-backed [`RangeClient`].

use std::cell::{Cell, RefCell};
use std::io::Write;
use std::str;
use std::time::Duration;

use curl::easy::Easy;

use super::parse::{self, ResponseHead};
use super::{FetchProgress, NetworkError, RangeClient};
use crate::config::SeggetConfig;
use crate::control::StopToken;
use crate::segmenter::ByteRange;

/// Timeouts applied to every curl handle.
#[derive(Debug, Clone, Copy)]
pub struct CurlOptions {
    pub connect_timeout: Duration,
    /// Abort when throughput stays below this many bytes/s for `low_speed_time`.
    /// Bounds how long a stalled segment can hide from the stop token.
    pub low_speed_limit: u32,
    pub low_speed_time: Duration,
    pub probe_timeout: Duration,
}

impl Default for CurlOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            low_speed_limit: 1024,
            low_speed_time: Duration::from_secs(60),
            probe_timeout: Duration::from_secs(30),
        }
    }
}

impl CurlOptions {
    pub fn from_config(cfg: &SeggetConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            low_speed_limit: cfg.low_speed_limit_bytes,
            low_speed_time: Duration::from_secs(cfg.low_speed_time_secs),
            ..Self::default()
        }
    }
}

/// One curl Easy handle per call; safe to share across worker threads.
#[derive(Debug, Clone, Default)]
pub struct CurlClient {
    opts: CurlOptions,
}

impl CurlClient {
    pub fn new(opts: CurlOptions) -> Self {
        Self { opts }
    }

    fn easy_for(&self, url: &str) -> Result<Easy, NetworkError> {
        let mut easy = Easy::new();
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.connect_timeout(self.opts.connect_timeout)?;
        easy.low_speed_limit(self.opts.low_speed_limit)?;
        easy.low_speed_time(self.opts.low_speed_time)?;
        Ok(easy)
    }
}

/// A 200 answer to a range request is only usable when it is exactly the requested bytes.
fn ignores_range(range: ByteRange, announced: Option<u64>) -> bool {
    range.start > 0 || announced.map_or(true, |len| len > range.len())
}

impl RangeClient for CurlClient {
    fn probe_length(&self, url: &str) -> Result<Option<u64>, NetworkError> {
        let mut lines: Vec<String> = Vec::new();

        let mut easy = self.easy_for(url)?;
        easy.nobody(true)?; // HEAD request
        easy.timeout(self.opts.probe_timeout)?;

        {
            let mut transfer = easy.transfer();
            transfer.header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    lines.push(s.trim_end().to_string());
                }
                true
            })?;
            transfer.perform()?;
        }

        let code = easy.response_code()?;
        if !(200..300).contains(&code) {
            return Err(NetworkError::Http(code));
        }

        let head = parse::parse_headers(&lines);
        if !head.accept_ranges {
            tracing::debug!(url, "server does not advertise Accept-Ranges: bytes");
        }
        tracing::debug!(url, content_length = ?head.content_length, "probe finished");
        Ok(head.content_length)
    }

    fn fetch_range(
        &self,
        url: &str,
        range: ByteRange,
        sink: &mut dyn Write,
        on_progress: &mut dyn FnMut(FetchProgress),
        stop: &StopToken,
    ) -> Result<u64, NetworkError> {
        let head = RefCell::new(ResponseHead::default());
        let written = Cell::new(0u64);
        let cancelled = Cell::new(false);
        let range_ignored = Cell::new(false);
        let rejected_status: Cell<Option<u32>> = Cell::new(None);
        let sink_error: RefCell<Option<std::io::Error>> = RefCell::new(None);

        let mut easy = self.easy_for(url)?;
        easy.range(&range.curl_value())?;
        easy.fail_on_error(true)?;
        // Enables the progress callback, which libcurl also fires on idle connections.
        easy.progress(true)?;

        {
            let mut transfer = easy.transfer();
            transfer.header_function(|data| {
                if let Ok(line) = str::from_utf8(data) {
                    head.borrow_mut().feed(line);
                }
                true
            })?;
            transfer.write_function(|data| {
                if stop.is_stopped() {
                    cancelled.set(true);
                    return Ok(0);
                }
                let (status, announced) = {
                    let h = head.borrow();
                    (h.status, h.content_length)
                };
                match status {
                    Some(200) if ignores_range(range, announced) => {
                        range_ignored.set(true);
                        return Ok(0);
                    }
                    Some(code) if !(200..300).contains(&code) => {
                        rejected_status.set(Some(code));
                        return Ok(0);
                    }
                    _ => {}
                }
                if let Err(e) = sink.write_all(data) {
                    sink_error.borrow_mut().replace(e);
                    return Ok(0);
                }
                let now = written.get() + data.len() as u64;
                written.set(now);
                on_progress(FetchProgress {
                    transferred: now,
                    expected: announced,
                });
                Ok(data.len())
            })?;
            transfer.progress_function(|_, _, _, _| {
                if stop.is_stopped() {
                    cancelled.set(true);
                    return false;
                }
                true
            })?;

            if let Err(e) = transfer.perform() {
                if cancelled.get() {
                    return Err(NetworkError::Cancelled);
                }
                if range_ignored.get() {
                    return Err(NetworkError::RangeIgnored(range.start));
                }
                if let Some(code) = rejected_status.get() {
                    return Err(NetworkError::Http(code));
                }
                if let Some(io_err) = sink_error.borrow_mut().take() {
                    return Err(NetworkError::Sink(io_err));
                }
                if e.is_http_returned_error() {
                    if let Some(code) = head.borrow().status {
                        return Err(NetworkError::Http(code));
                    }
                }
                return Err(NetworkError::Curl(e));
            }
        }

        let code = easy.response_code()?;
        if !(200..300).contains(&code) {
            return Err(NetworkError::Http(code));
        }
        Ok(written.get())
    }
}
