//! `"start-end"` range descriptors and the resume-point arithmetic behind them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ledger::{LedgerEntry, TerminalState};
use crate::segmenter::{planned_start, SegmentId};

/// Resume point of one segment, written as `"start-end"` (inclusive end).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeDescriptor {
    pub start: u64,
    pub end: u64,
}

impl fmt::Display for RangeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl FromStr for RangeDescriptor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| format!("range descriptor {:?} has no '-'", s))?;
        let start = start
            .parse()
            .map_err(|_| format!("bad range start in {:?}", s))?;
        let end = end.parse().map_err(|_| format!("bad range end in {:?}", s))?;
        Ok(Self { start, end })
    }
}

impl Serialize for RangeDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RangeDescriptor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// What the store needs to know about the attempt that produced a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttemptPlan {
    /// `floor(total_size / segment_count)` of the target.
    pub partition_size: u64,
    /// True when the attempt continued segments from an earlier record.
    pub is_resume: bool,
    /// Absolute start offset each resumed segment restarted from.
    pub last_confirmed: BTreeMap<SegmentId, u64>,
}

/// Resume point for one ledger entry.
///
/// The start is the confirmed offset plus the bytes transferred in this
/// attempt. On a fresh attempt the confirmed offset is the segment's planned
/// start. A complete segment's start is pulled back by one byte so that it
/// names the last byte held rather than the next byte wanted.
pub fn resume_descriptor(
    entry: &LedgerEntry,
    state: TerminalState,
    plan: &AttemptPlan,
) -> RangeDescriptor {
    let base = if plan.is_resume {
        plan.last_confirmed.get(&entry.id).copied().unwrap_or(0)
    } else {
        planned_start(entry.id, plan.partition_size)
    };
    let mut start = base + entry.transferred;
    if state == TerminalState::Complete {
        start = start.saturating_sub(1);
    }
    RangeDescriptor {
        start,
        end: entry.end,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::SegmentState;

    fn entry(id: SegmentId, end: u64, transferred: u64) -> LedgerEntry {
        LedgerEntry {
            id,
            end,
            transferred,
            state: SegmentState::InProgress,
        }
    }

    fn fresh_plan() -> AttemptPlan {
        AttemptPlan {
            partition_size: 250,
            ..AttemptPlan::default()
        }
    }

    #[test]
    fn fresh_attempt_uses_planned_start() {
        let plan = fresh_plan();
        let d = resume_descriptor(&entry(1, 250, 125), TerminalState::Incomplete, &plan);
        assert_eq!(d.to_string(), "125-250");
        let d = resume_descriptor(&entry(3, 750, 125), TerminalState::Incomplete, &plan);
        assert_eq!(d.to_string(), "626-750");
    }

    #[test]
    fn complete_segment_points_at_its_last_byte() {
        let d = resume_descriptor(&entry(2, 500, 250), TerminalState::Complete, &fresh_plan());
        assert_eq!(d.to_string(), "500-500");
        let d = resume_descriptor(&entry(1, 250, 251), TerminalState::Complete, &fresh_plan());
        assert_eq!(d.to_string(), "250-250");
    }

    #[test]
    fn resumed_attempt_adds_to_last_confirmed() {
        let plan = AttemptPlan {
            partition_size: 250,
            is_resume: true,
            last_confirmed: BTreeMap::from([(3, 626)]),
        };
        let d = resume_descriptor(&entry(3, 750, 24), TerminalState::Incomplete, &plan);
        assert_eq!(d.to_string(), "650-750");
        let d = resume_descriptor(&entry(3, 750, 125), TerminalState::Complete, &plan);
        assert_eq!(d.to_string(), "750-750");
    }

    #[test]
    fn untouched_segment_keeps_its_start() {
        let d = resume_descriptor(&entry(4, 1000, 0), TerminalState::Incomplete, &fresh_plan());
        assert_eq!(d.to_string(), "751-1000");
    }

    #[test]
    fn descriptor_parse() {
        let d: RangeDescriptor = "500-1000".parse().unwrap();
        assert_eq!(d, RangeDescriptor { start: 500, end: 1000 });
        assert!("5001000".parse::<RangeDescriptor>().is_err());
        assert!("a-1".parse::<RangeDescriptor>().is_err());
        assert!("1-".parse::<RangeDescriptor>().is_err());
    }
}
