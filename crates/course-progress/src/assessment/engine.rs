//! Assessment engine — applying quiz submissions to progress records.

use crate::authorization::evaluate_access;
use crate::config::PolicyConfig;
use crate::error::{ProgressError, Result};
use crate::model::{Module, ModuleId, ProgressRecord, StudentId, Versioned};
use crate::storage::{RecordStore, WriteOutcome};

// ---------------------------------------------------------------------------
// Score validation
// ---------------------------------------------------------------------------

/// Reject scores outside 0-100 (and NaN).
pub fn validate_score(raw_score: f64) -> Result<()> {
    if !raw_score.is_finite() || !(0.0..=100.0).contains(&raw_score) {
        return Err(ProgressError::Validation(format!(
            "score must be 0-100, got {raw_score}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Pure transition
// ---------------------------------------------------------------------------

/// Apply one accepted submission to a record.
///
/// `passed` reflects only this submission, so a later failing attempt
/// clears an earlier pass.
///
/// # Errors
///
/// Returns `InvalidFileFormat` if the stored attempt counter is already at
/// its maximum; the record is left unchanged.
pub fn apply_submission(
    record: &mut ProgressRecord,
    module: &Module,
    raw_score: f64,
    now: u64,
) -> Result<()> {
    record.attempts = record.attempts.checked_add(1).ok_or_else(|| {
        ProgressError::InvalidFileFormat(format!(
            "attempt counter for {}/{} is at its maximum ({})",
            record.student_id, record.module_id, record.attempts
        ))
    })?;
    record.score = raw_score;
    record.passed = raw_score >= f64::from(module.pass_mark);
    record.updated_at = now;
    Ok(())
}

// ---------------------------------------------------------------------------
// Submit attempt
// ---------------------------------------------------------------------------

/// Record a quiz submission for `student` on `module_id`.
///
/// The record is created on first submission. The gate is re-evaluated on
/// every compare-and-swap round, so concurrent submissions cannot push a
/// record past the attempt limit; each conflict re-reads and retries, up
/// to `policy.max_write_retries` retries.
///
/// # Errors
///
/// - `Validation` if `raw_score` is outside 0-100
/// - `UnknownModule` if the module does not exist
/// - `Unauthorized` if the module is locked for the student
/// - `Concurrency` if every retry lost the race
/// - `Persistence` / `Io` for store failures
pub fn submit_attempt(
    store: &dyn RecordStore,
    policy: &PolicyConfig,
    student: &StudentId,
    module_id: &ModuleId,
    raw_score: f64,
) -> Result<ProgressRecord> {
    validate_score(raw_score)?;
    let module = store
        .get_module(module_id)?
        .ok_or_else(|| ProgressError::UnknownModule(module_id.clone()))?;

    for round in 0..=policy.max_write_retries {
        let current = store.get_record(student, module_id)?;
        let expected = current.as_ref().map(|v| v.revision);
        let mut record = current
            .map(Versioned::into_inner)
            .unwrap_or_else(|| ProgressRecord::new(student.clone(), module_id.clone()));

        let access = evaluate_access(student, &module, Some(&record), policy);
        if !access.allowed {
            return Err(ProgressError::Unauthorized {
                student: student.clone(),
                module: module_id.clone(),
            });
        }

        apply_submission(&mut record, &module, raw_score, crate::time::now_micros())?;

        match store.put_record(&record, expected)? {
            WriteOutcome::Committed { revision } => {
                log::info!(
                    "submission {}/{}: attempt {} score {} passed={} (rev {})",
                    student,
                    module_id,
                    record.attempts,
                    record.score,
                    record.passed,
                    revision
                );
                return Ok(record);
            }
            WriteOutcome::Conflict { current } => {
                log::debug!(
                    "submission {}/{} conflicted (expected {:?}, found {:?}), round {}",
                    student,
                    module_id,
                    expected,
                    current,
                    round
                );
            }
        }
    }

    log::warn!(
        "submission {}/{} gave up after {} retries",
        student,
        module_id,
        policy.max_write_retries
    );
    Err(ProgressError::Concurrency {
        student: student.clone(),
        module: module_id.clone(),
        retries: policy.max_write_retries,
    })
}
