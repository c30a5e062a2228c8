//! Assessment — turning quiz submissions into progress state.
//!
//! The assessment module provides:
//! - Score validation (0-100, finite)
//! - The pure submission transition (attempts, score, pass flag, timestamp)
//! - `submit_attempt`, the gated compare-and-swap write with bounded retries

pub mod engine;

pub use engine::{apply_submission, submit_attempt, validate_score};
