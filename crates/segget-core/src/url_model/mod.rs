//! File-name derivation from the URL's final path component.
//!
//! The derived name keys the state record and names the segment files and
//! the merged artifact, so it must be deterministic and filesystem-safe.

/// Name used when the URL path has no usable final component.
pub const DEFAULT_FILENAME: &str = "download.bin";

const NAME_MAX: usize = 255;

/// Derives the local file name for `url`.
///
/// Returns `None` when `url` does not parse. A URL whose path has no usable
/// final component yields [`DEFAULT_FILENAME`].
///
/// # Examples
///
/// - `https://example.com/pub/debian-12.iso` → `debian-12.iso`
/// - `https://example.com/` → `download.bin`
pub fn derive_filename(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let name = parsed
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(sanitize_filename)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string());
    Some(name)
}

/// Keeps ASCII alphanumerics and `.`, `-`, `_`, `+`; each run of other
/// characters becomes a single `_`. Percent escapes are not decoded.
/// Leading/trailing dots and underscores are trimmed so the result is never
/// hidden, `.` or `..`.
pub fn sanitize_filename(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '+') {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    let trimmed = out.trim_matches(|c| c == '.' || c == '_');
    trimmed.chars().take(NAME_MAX).collect()
}
