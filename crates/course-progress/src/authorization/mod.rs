//! Authorization — deciding whether a module quiz may be attempted.
//!
//! The authorization module provides:
//! - The lock predicate (attempts exhausted without a pass)
//! - Allow-list and record-override exceptions to the lock
//! - A structured [`AccessDecision`] for UIs and a boolean quick check

pub mod gate;

pub use gate::{can_attempt, check_access, evaluate_access, AccessDecision};
