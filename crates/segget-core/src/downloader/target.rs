//! The resource being downloaded.

use crate::error::DownloadError;
use crate::fetch::RangeClient;
use crate::segmenter::partition_size;
use crate::url_model::derive_filename;

/// URL, derived file name, probed size and segment count of one download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub url: String,
    pub file_name: String,
    pub total_size: u64,
    pub segment_count: u32,
}

impl Target {
    pub fn new(
        url: impl Into<String>,
        file_name: impl Into<String>,
        total_size: u64,
        segment_count: u32,
    ) -> Self {
        Self {
            url: url.into(),
            file_name: file_name.into(),
            total_size,
            segment_count,
        }
    }

    /// Derive the file name from `url` and discover the size with one probe.
    pub fn probe(
        url: &str,
        segment_count: u32,
        client: &dyn RangeClient,
    ) -> Result<Self, DownloadError> {
        if segment_count == 0 {
            return Err(DownloadError::invalid("segment count must be at least 1"));
        }
        let file_name = derive_filename(url)
            .ok_or_else(|| DownloadError::invalid(format!("not a valid URL: {}", url)))?;
        let total_size = match client.probe_length(url)? {
            Some(n) if n > 0 => n,
            _ => {
                return Err(DownloadError::invalid(format!(
                    "server did not report a size for {}",
                    url
                )))
            }
        };
        tracing::info!(url, file = %file_name, total_size, segment_count, "probed target");
        Ok(Self::new(url, file_name, total_size, segment_count))
    }

    /// `floor(total_size / segment_count)`.
    pub fn partition_size(&self) -> u64 {
        partition_size(self.total_size, self.segment_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::StopToken;
    use crate::fetch::{FetchProgress, NetworkError};
    use crate::segmenter::ByteRange;
    use std::io::Write;

    struct FixedLength(Option<u64>);

    impl RangeClient for FixedLength {
        fn probe_length(&self, _url: &str) -> Result<Option<u64>, NetworkError> {
            Ok(self.0)
        }

        fn fetch_range(
            &self,
            _url: &str,
            _range: ByteRange,
            _sink: &mut dyn Write,
            _on_progress: &mut dyn FnMut(FetchProgress),
            _stop: &StopToken,
        ) -> Result<u64, NetworkError> {
            Err(NetworkError::Http(500))
        }
    }

    #[test]
    fn probe_derives_name_and_size() {
        let t = Target::probe("http://example.com/pub/file.iso", 4, &FixedLength(Some(1000))).unwrap();
        assert_eq!(t.file_name, "file.iso");
        assert_eq!(t.total_size, 1000);
        assert_eq!(t.partition_size(), 250);
    }

    #[test]
    fn probe_rejects_unknown_size_zero_count_and_bad_url() {
        assert!(matches!(
            Target::probe("http://example.com/f", 4, &FixedLength(None)),
            Err(DownloadError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            Target::probe("http://example.com/f", 4, &FixedLength(Some(0))),
            Err(DownloadError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            Target::probe("http://example.com/f", 0, &FixedLength(Some(10))),
            Err(DownloadError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            Target::probe("not a url", 4, &FixedLength(Some(10))),
            Err(DownloadError::InvalidConfiguration(_))
        ));
    }
}
