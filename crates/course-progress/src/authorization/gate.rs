//! Authorization gate — may a student start a module quiz right now?
//!
//! Checks, in order:
//! 1. Exhaustion (attempts used up without a pass)
//! 2. Allow-list membership on the module (administrator re-authorization)
//! 3. Record-level authorization override
//!
//! A student with no record yet is always allowed (first attempt).

use serde::Serialize;

use crate::config::PolicyConfig;
use crate::error::{ProgressError, Result};
use crate::model::{Module, ModuleId, ProgressRecord, StudentId};
use crate::storage::RecordStore;

/// Structured result of an access check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessDecision {
    /// Attempts recorded so far.
    pub attempts_used: u32,
    /// Attempts left before the module locks (0 once exhausted).
    pub attempts_remaining: u32,
    /// Attempts exhausted without a pass.
    pub locked: bool,
    /// Student is on the module's allow-list.
    pub on_allow_list: bool,
    /// The record carries the authorization override.
    pub record_authorized: bool,
    /// Overall decision.
    pub allowed: bool,
}

/// Decide access from an already-loaded record and module.
pub fn evaluate_access(
    student: &StudentId,
    module: &Module,
    record: Option<&ProgressRecord>,
    policy: &PolicyConfig,
) -> AccessDecision {
    let attempts_used = record.map(|r| r.attempts).unwrap_or(0);
    let locked = record
        .map(|r| r.is_exhausted(policy.max_attempts))
        .unwrap_or(false);
    let on_allow_list = module.allows(student);
    let record_authorized = record.map(|r| r.is_authorized).unwrap_or(false);

    AccessDecision {
        attempts_used,
        attempts_remaining: policy.max_attempts.saturating_sub(attempts_used),
        locked,
        on_allow_list,
        record_authorized,
        allowed: !locked || on_allow_list || record_authorized,
    }
}

/// Load the module and record, then evaluate access.
///
/// # Errors
///
/// Returns `ProgressError::UnknownModule` if the module does not exist, or
/// any store error.
pub fn check_access(
    store: &dyn RecordStore,
    policy: &PolicyConfig,
    student: &StudentId,
    module_id: &ModuleId,
) -> Result<AccessDecision> {
    let module = store
        .get_module(module_id)?
        .ok_or_else(|| ProgressError::UnknownModule(module_id.clone()))?;
    let record = store.get_record(student, module_id)?;
    let decision = evaluate_access(student, &module, record.as_ref().map(|v| &v.value), policy);
    log::debug!(
        "access {}/{}: used={} locked={} allow_list={} override={} -> {}",
        student,
        module_id,
        decision.attempts_used,
        decision.locked,
        decision.on_allow_list,
        decision.record_authorized,
        decision.allowed
    );
    Ok(decision)
}

/// Quick check: may `student` attempt `module_id` now?
pub fn can_attempt(
    store: &dyn RecordStore,
    policy: &PolicyConfig,
    student: &StudentId,
    module_id: &ModuleId,
) -> Result<bool> {
    check_access(store, policy, student, module_id).map(|d| d.allowed)
}
