//! Transcript builder — deriving the academic record from progress records.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::model::{CourseId, Module, ModuleId, ProgressRecord, StudentId};
use crate::storage::RecordStore;

use super::types::{Decision, GradeBand, Transcript, TranscriptRow};

/// Final averages at or above this are `EXCELLENT`.
pub const EXCELLENT_FROM: f64 = 80.0;

/// Final averages at or above this (and below `EXCELLENT_FROM`) are `VERY GOOD`.
pub const VERY_GOOD_FROM: f64 = 70.0;

/// Decision for one module given its record, if any.
pub fn decide(record: Option<&ProgressRecord>) -> Decision {
    match record {
        Some(r) if r.passed && r.attempts == 1 => Decision::Competent,
        Some(r) if r.passed && r.attempts > 1 => Decision::NotCompetent,
        _ => Decision::Pending,
    }
}

pub fn grade_band(final_average: f64) -> GradeBand {
    if final_average >= EXCELLENT_FROM {
        GradeBand::Excellent
    } else if final_average >= VERY_GOOD_FROM {
        GradeBand::VeryGood
    } else {
        GradeBand::Pass
    }
}

/// Build the transcript from already-loaded modules and records.
///
/// Modules without a record appear with score 0 and decision `-`.
pub fn assemble(
    student: &StudentId,
    course: &CourseId,
    modules: &[Module],
    records: &[ProgressRecord],
) -> Transcript {
    let by_module: BTreeMap<&ModuleId, &ProgressRecord> =
        records.iter().map(|r| (&r.module_id, r)).collect();

    let rows: Vec<TranscriptRow> = modules
        .iter()
        .map(|m| {
            let record = by_module.get(&m.id).copied();
            TranscriptRow {
                module_id: m.id.clone(),
                title: m.title.clone(),
                score: record.map(|r| r.score).unwrap_or(0.0),
                attempts: record.map(|r| r.attempts).unwrap_or(0),
                decision: decide(record),
            }
        })
        .collect();

    let final_average = if rows.is_empty() {
        0.0
    } else {
        rows.iter().map(|r| r.score).sum::<f64>() / rows.len() as f64
    };

    Transcript {
        student_id: student.clone(),
        course_id: course.clone(),
        rows,
        final_average,
        grade: grade_band(final_average),
    }
}

/// Build the transcript for `student` in `course` from the store.
pub fn build_transcript(
    store: &dyn RecordStore,
    student: &StudentId,
    course: &CourseId,
) -> Result<Transcript> {
    let modules = store.list_modules(course)?;
    let records = store.list_records(student, course)?;
    Ok(assemble(student, course, &modules, &records))
}
