//! Certificate eligibility — has the student finished the course?
//!
//! "Finished" means every module, the final assessment included, has a
//! progress record, i.e. was attempted at least once. Passing is not
//! required: a recorded failing score still counts.

use std::collections::BTreeSet;

use crate::error::Result;
use crate::model::{CourseId, ModuleId, StudentId};
use crate::storage::RecordStore;

/// Whether `student` has attempted every module of `course`.
///
/// A course with no modules is never finished.
pub fn is_course_finished(
    store: &dyn RecordStore,
    student: &StudentId,
    course: &CourseId,
) -> Result<bool> {
    let modules = store.list_modules(course)?;
    if modules.is_empty() {
        return Ok(false);
    }
    let attempted: BTreeSet<ModuleId> = store
        .list_records(student, course)?
        .into_iter()
        .map(|r| r.module_id)
        .collect();
    Ok(modules.iter().all(|m| attempted.contains(&m.id)))
}
