//! Segment type and range planning.

use serde::{Deserialize, Serialize};

use crate::error::DownloadError;

/// Segment identifier, 1-based.
pub type SegmentId = u32;

/// A byte range `[start, end]` with an inclusive end, as sent in `Range: bytes=start-end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Number of bytes covered (0 when `start > end`).
    pub fn len(&self) -> u64 {
        if self.start > self.end {
            0
        } else {
            self.end - self.start + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes of this range that exist in a resource of `total_size` bytes.
    /// Servers clamp a range end past the last byte, so this is what a fetch delivers.
    pub fn len_within(&self, total_size: u64) -> u64 {
        if total_size == 0 {
            return 0;
        }
        ByteRange::new(self.start, self.end.min(total_size - 1)).len()
    }

    /// curl `CURLOPT_RANGE` value: `start-end` without the `bytes=` prefix.
    pub fn curl_value(&self) -> String {
        format!("{}-{}", self.start, self.end)
    }
}

/// One segment of a transfer attempt.
///
/// `range` is what this attempt fetches. `resume_offset` is the last confirmed
/// absolute offset carried over from the state record (0 on a fresh plan).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub id: SegmentId,
    pub range: ByteRange,
    pub resume_offset: u64,
}

impl Segment {
    pub fn fresh(id: SegmentId, start: u64, end: u64) -> Self {
        Self {
            id,
            range: ByteRange::new(start, end),
            resume_offset: 0,
        }
    }

    /// A segment continued from a state record: it restarts at `start`.
    pub fn resumed(id: SegmentId, start: u64, end: u64) -> Self {
        Self {
            id,
            range: ByteRange::new(start, end),
            resume_offset: start,
        }
    }
}

/// What happens to the `total % segments` bytes that floor division leaves over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangePolicy {
    /// Every segment k ends at `k * partition_size`; trailing remainder bytes are not planned.
    #[default]
    Truncate,
    /// Like `Truncate`, but the last segment ends at `total_size - 1`.
    ExtendLast,
}

/// `floor(total_size / segment_count)`, 0 for a zero count.
pub fn partition_size(total_size: u64, segment_count: u32) -> u64 {
    if segment_count == 0 {
        return 0;
    }
    total_size / segment_count as u64
}

/// Planned start of segment `id`: 0 for the first, `(id-1) * partition + 1` after that.
pub fn planned_start(id: SegmentId, partition_size: u64) -> u64 {
    if id <= 1 {
        0
    } else {
        (id as u64 - 1) * partition_size + 1
    }
}

/// Builds the fresh-start plan for `total_size` bytes in `segment_count` segments.
///
/// Segment k covers `[planned_start(k), k * partition]`; neighbouring ranges
/// never overlap and leave no gap. Under [`RangePolicy::Truncate`] the last
/// segment also ends at `N * partition`, which lies past the final byte when
/// the size divides evenly and short of it otherwise.
pub fn plan_segments(
    total_size: u64,
    segment_count: u32,
    policy: RangePolicy,
) -> Result<Vec<Segment>, DownloadError> {
    if segment_count == 0 {
        return Err(DownloadError::invalid("segment count must be at least 1"));
    }
    if total_size == 0 {
        return Err(DownloadError::invalid("resource size is unknown or zero"));
    }
    let partition = partition_size(total_size, segment_count);
    if partition == 0 {
        return Err(DownloadError::invalid(format!(
            "{} bytes cannot be split into {} segments",
            total_size, segment_count
        )));
    }

    let mut out = Vec::with_capacity(segment_count as usize);
    for id in 1..=segment_count {
        let start = planned_start(id, partition);
        let mut end = id as u64 * partition;
        if id == segment_count && policy == RangePolicy::ExtendLast {
            end = end.max(total_size - 1);
        }
        out.push(Segment::fresh(id, start, end));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranges(segs: &[Segment]) -> Vec<(u64, u64)> {
        segs.iter().map(|s| (s.range.start, s.range.end)).collect()
    }

    #[test]
    fn plan_segments_even() {
        let segs = plan_segments(1000, 4, RangePolicy::Truncate).unwrap();
        assert_eq!(
            ranges(&segs),
            vec![(0, 250), (251, 500), (501, 750), (751, 1000)]
        );
        assert!(segs.iter().all(|s| s.resume_offset == 0));
        assert_eq!(
            segs.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
    }

    #[test]
    fn plan_segments_remainder_truncated() {
        let segs = plan_segments(1003, 4, RangePolicy::Truncate).unwrap();
        assert_eq!(segs[3].range.end, 1000);
        // bytes 1001 and 1002 are not in any planned range
        let covered: u64 = segs.iter().map(|s| s.range.len_within(1003)).sum();
        assert_eq!(covered, 1001);
    }

    #[test]
    fn plan_segments_remainder_extend_last() {
        let segs = plan_segments(1003, 4, RangePolicy::ExtendLast).unwrap();
        assert_eq!(segs[3].range, ByteRange::new(751, 1002));
        let covered: u64 = segs.iter().map(|s| s.range.len_within(1003)).sum();
        assert_eq!(covered, 1003);
        // evenly divisible sizes are planned identically under both policies
        assert_eq!(
            plan_segments(1000, 4, RangePolicy::ExtendLast).unwrap(),
            plan_segments(1000, 4, RangePolicy::Truncate).unwrap()
        );
    }

    #[test]
    fn plan_segments_properties_hold_for_many_inputs() {
        for total in [1u64, 7, 64, 999, 1000, 1001, 65_537] {
            for count in 1u32..=9 {
                let Ok(segs) = plan_segments(total, count, RangePolicy::Truncate) else {
                    assert!(total < count as u64);
                    continue;
                };
                let p = total / count as u64;
                assert_eq!(segs.len(), count as usize);
                for (k, s) in segs.iter().enumerate() {
                    assert_eq!(s.range.end, (k as u64 + 1) * p);
                    if k > 0 {
                        let prev = &segs[k - 1];
                        assert!(s.range.start > prev.range.start);
                        assert_eq!(s.range.start, prev.range.end + 1);
                    }
                }
            }
        }
    }

    #[test]
    fn plan_segments_one() {
        let segs = plan_segments(100, 1, RangePolicy::Truncate).unwrap();
        assert_eq!(ranges(&segs), vec![(0, 100)]);
        assert_eq!(segs[0].range.len_within(100), 100);
    }

    #[test]
    fn plan_segments_rejects_zero_count_and_size() {
        assert!(matches!(
            plan_segments(1000, 0, RangePolicy::Truncate),
            Err(DownloadError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            plan_segments(0, 4, RangePolicy::Truncate),
            Err(DownloadError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            plan_segments(3, 4, RangePolicy::Truncate),
            Err(DownloadError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn planned_start_matches_plan() {
        let segs = plan_segments(1000, 4, RangePolicy::Truncate).unwrap();
        for s in &segs {
            assert_eq!(planned_start(s.id, 250), s.range.start);
        }
    }

    #[test]
    fn byte_range_helpers() {
        let r = ByteRange::new(751, 1000);
        assert_eq!(r.len(), 250);
        assert_eq!(r.len_within(1000), 249);
        assert_eq!(r.curl_value(), "751-1000");
        assert!(ByteRange::new(5, 4).is_empty());
        assert_eq!(ByteRange::new(1200, 1300).len_within(1000), 0);
    }

    #[test]
    fn resumed_segment_carries_offset() {
        let s = Segment::resumed(3, 500, 1000);
        assert_eq!(s.resume_offset, 500);
        assert_eq!(s.range.len(), 501);
    }
}
