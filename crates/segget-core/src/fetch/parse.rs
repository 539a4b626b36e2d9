//! Parse HTTP response header lines collected by curl.

/// Key fields of the final response in a (possibly redirected) exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ResponseHead {
    pub status: Option<u32>,
    pub content_length: Option<u64>,
    pub accept_ranges: bool,
}

impl ResponseHead {
    /// Feed one header line. A status line starts a new response, so after a
    /// redirect only the last response's headers remain.
    pub fn feed(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        if let Some(code) = status_code(line) {
            *self = ResponseHead {
                status: Some(code),
                ..ResponseHead::default()
            };
            return;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            let value = value.trim();
            if name.eq_ignore_ascii_case("content-length") {
                if let Ok(n) = value.parse::<u64>() {
                    self.content_length = Some(n);
                }
            } else if name.eq_ignore_ascii_case("accept-ranges") {
                self.accept_ranges = value.eq_ignore_ascii_case("bytes");
            }
        }
    }
}

/// Parse collected header lines into the final response's head.
pub(crate) fn parse_headers(lines: &[String]) -> ResponseHead {
    let mut head = ResponseHead::default();
    for line in lines {
        head.feed(line);
    }
    head
}

/// Status code of an `HTTP/x.y NNN reason` line.
fn status_code(line: &str) -> Option<u32> {
    if !line.starts_with("HTTP/") {
        return None;
    }
    line.split_whitespace().nth(1)?.parse().ok()
}
