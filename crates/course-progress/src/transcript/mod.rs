//! Transcript — the aggregated per-module report of a student's outcomes.
//!
//! Rows follow course order. A module passed on the first attempt reads
//! `COMPETENT`; passed on a later attempt reads `NOT COMPETENT`; anything
//! else reads `-`. The final average counts every module, the final
//! assessment included, and maps onto a grade band.

pub mod builder;
pub mod types;

pub use builder::{assemble, build_transcript, decide, grade_band};
pub use types::{Decision, GradeBand, Transcript, TranscriptRow};
