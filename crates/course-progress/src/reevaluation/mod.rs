//! Re-evaluation — fee standing and administrator re-authorization.
//!
//! The reevaluation module provides:
//! - Running average over non-final modules and the fee-waiver decision
//! - Listing modules a student has locked
//! - Student re-evaluation requests and the admin queue of pending ones
//! - `grant_access`, the transactional reset + allow-list addition

pub mod engine;
pub mod types;

pub use types::{GrantOutcome, Standing};

pub use engine::{
    compute_standing, grant_access, list_locked_modules, list_pending_requests,
    request_reevaluation,
};
