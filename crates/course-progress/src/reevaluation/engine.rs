//! Re-evaluation engine — standing, locked modules, requests and grants.

use std::collections::BTreeMap;

use crate::authorization::evaluate_access;
use crate::config::PolicyConfig;
use crate::error::{ProgressError, Result};
use crate::model::{CourseId, Module, ModuleId, ProgressRecord, StudentId};
use crate::storage::{RecordStore, WriteOutcome};

use super::types::{GrantOutcome, Standing};

// ---------------------------------------------------------------------------
// Standing
// ---------------------------------------------------------------------------

/// Compute the student's running average and fee-waiver eligibility.
///
/// The average covers non-final modules only; the transcript's final
/// average also counts the final assessment.
pub fn compute_standing(
    store: &dyn RecordStore,
    policy: &PolicyConfig,
    student: &StudentId,
    course: &CourseId,
) -> Result<Standing> {
    let modules = store.list_modules(course)?;
    let scores = scores_by_module(store.list_records(student, course)?);

    let counted: Vec<&Module> = modules.iter().filter(|m| !m.is_final_assessment).collect();
    let total: f64 = counted
        .iter()
        .map(|m| scores.get(&m.id).copied().unwrap_or(0.0))
        .sum();
    let average_score = if counted.is_empty() {
        0.0
    } else {
        total / counted.len() as f64
    };

    Ok(Standing {
        student_id: student.clone(),
        course_id: course.clone(),
        average_score,
        modules_counted: counted.len(),
        fee_required: average_score < policy.fee_threshold_percent,
    })
}

fn scores_by_module(records: Vec<ProgressRecord>) -> BTreeMap<ModuleId, f64> {
    records.into_iter().map(|r| (r.module_id, r.score)).collect()
}

// ---------------------------------------------------------------------------
// Locked modules
// ---------------------------------------------------------------------------

/// Modules of `course` whose attempts the student has exhausted without a
/// pass, in course order.
pub fn list_locked_modules(
    store: &dyn RecordStore,
    policy: &PolicyConfig,
    student: &StudentId,
    course: &CourseId,
) -> Result<Vec<Module>> {
    let records: BTreeMap<ModuleId, ProgressRecord> = store
        .list_records(student, course)?
        .into_iter()
        .map(|r| (r.module_id.clone(), r))
        .collect();

    Ok(store
        .list_modules(course)?
        .into_iter()
        .filter(|m| {
            records
                .get(&m.id)
                .map(|r| r.is_exhausted(policy.max_attempts))
                .unwrap_or(false)
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Grant access
// ---------------------------------------------------------------------------

/// Re-authorize a locked module for a student.
///
/// Resets the record (attempts, score, pass flag, request flag) and adds
/// the student to the module's allow-list in one transaction. A module that
/// is not locked is left untouched and reported as `NotLocked`.
///
/// # Errors
///
/// Returns `UnknownModule` if the module does not exist, or `Persistence`
/// if the transaction cannot be committed, in which case neither the reset
/// nor the allow-list addition is visible.
pub fn grant_access(
    store: &dyn RecordStore,
    policy: &PolicyConfig,
    student: &StudentId,
    module_id: &ModuleId,
) -> Result<GrantOutcome> {
    let mut outcome = GrantOutcome::NotLocked;

    store.with_transaction(&mut |tx| {
        outcome = GrantOutcome::NotLocked;
        if tx.get_module(module_id)?.is_none() {
            return Err(ProgressError::UnknownModule(module_id.clone()));
        }
        let Some(mut record) = tx.get_record(student, module_id)? else {
            return Ok(());
        };
        if !record.is_exhausted(policy.max_attempts) {
            return Ok(());
        }

        record.reset(crate::time::now_micros());
        tx.put_record(&record)?;
        tx.add_to_allow_list(module_id, student)?;
        outcome = GrantOutcome::Granted { record };
        Ok(())
    })?;

    match &outcome {
        GrantOutcome::Granted { .. } => {
            log::info!("re-evaluation granted for {}/{}", student, module_id)
        }
        GrantOutcome::NotLocked => log::warn!(
            "grant_access on {}/{} ignored: module is not locked",
            student,
            module_id
        ),
    }
    Ok(outcome)
}

// ---------------------------------------------------------------------------
// Re-evaluation requests
// ---------------------------------------------------------------------------

/// Flag a locked module as awaiting administrator re-evaluation.
///
/// Repeating the request is a no-op.
///
/// # Errors
///
/// Returns `Validation` if the student can still attempt the module,
/// `UnknownModule` for a missing module, or `Concurrency` if the flag could
/// not be written within the retry bound.
pub fn request_reevaluation(
    store: &dyn RecordStore,
    policy: &PolicyConfig,
    student: &StudentId,
    module_id: &ModuleId,
) -> Result<ProgressRecord> {
    let module = store
        .get_module(module_id)?
        .ok_or_else(|| ProgressError::UnknownModule(module_id.clone()))?;

    for _ in 0..=policy.max_write_retries {
        let current = store.get_record(student, module_id)?;
        let access = evaluate_access(
            student,
            &module,
            current.as_ref().map(|v| &v.value),
            policy,
        );
        let Some(current) = current.filter(|_| !access.allowed) else {
            return Err(ProgressError::Validation(format!(
                "module {module_id} is not locked for {student}; nothing to re-evaluate"
            )));
        };

        if current.value.quiz_requested {
            return Ok(current.value);
        }

        let mut record = current.value;
        record.quiz_requested = true;
        record.updated_at = crate::time::now_micros();

        if let WriteOutcome::Committed { .. } = store.put_record(&record, Some(current.revision))? {
            log::info!("re-evaluation requested for {}/{}", student, module_id);
            return Ok(record);
        }
    }

    Err(ProgressError::Concurrency {
        student: student.clone(),
        module: module_id.clone(),
        retries: policy.max_write_retries,
    })
}

/// Outstanding re-evaluation requests in a course, by module order then
/// student.
pub fn list_pending_requests(
    store: &dyn RecordStore,
    policy: &PolicyConfig,
    course: &CourseId,
) -> Result<Vec<ProgressRecord>> {
    let positions: BTreeMap<ModuleId, usize> = store
        .list_modules(course)?
        .into_iter()
        .enumerate()
        .map(|(i, m)| (m.id, i))
        .collect();

    let mut pending: Vec<ProgressRecord> = store
        .list_course_records(course)?
        .into_iter()
        .filter(|r| r.quiz_requested && r.is_exhausted(policy.max_attempts))
        .collect();
    pending.sort_by(|a, b| {
        positions
            .get(&a.module_id)
            .cmp(&positions.get(&b.module_id))
            .then_with(|| a.student_id.cmp(&b.student_id))
    });
    Ok(pending)
}
