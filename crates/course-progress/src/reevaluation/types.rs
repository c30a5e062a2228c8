//! Data structures for re-evaluation.

use serde::{Deserialize, Serialize};

use crate::model::{CourseId, ProgressRecord, StudentId};

/// A student's running standing in a course, used for fee waivers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub student_id: StudentId,
    pub course_id: CourseId,
    /// Mean score over the non-final modules; unattempted modules count as 0.
    pub average_score: f64,
    /// Number of modules in the average's denominator.
    pub modules_counted: usize,
    /// Re-sits carry a fee when the average is below the policy threshold.
    pub fee_required: bool,
}

/// What `grant_access` did.
#[derive(Debug, Clone, PartialEq)]
pub enum GrantOutcome {
    /// The record was reset and the student added to the allow-list.
    Granted { record: ProgressRecord },
    /// The module was not locked for the student; nothing changed.
    NotLocked,
}

impl GrantOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, GrantOutcome::Granted { .. })
    }
}
