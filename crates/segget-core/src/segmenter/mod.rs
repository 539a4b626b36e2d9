//! Range math and segment planning.
//!
//! Responsible for:
//! - Splitting a resource into N inclusive byte ranges (fresh start).
//! - Range arithmetic shared by workers and the state record.

mod range;

pub use range::{
    partition_size, plan_segments, planned_start, ByteRange, RangePolicy, Segment, SegmentId,
};
