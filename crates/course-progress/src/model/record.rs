//! Per-student, per-module progress record.

use serde::{Deserialize, Serialize};

use super::{ModuleId, StudentId};

/// Quiz progress of one student on one module.
///
/// Created lazily on the first quiz attempt. Documents written by older
/// portal versions may lack the flag fields; those default to `false`
/// when decoded so business logic never sees an absent field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub student_id: StudentId,
    pub module_id: ModuleId,
    /// Score of the most recent accepted submission (0-100).
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub passed: bool,
    /// Student has asked for a re-evaluation of a locked module.
    #[serde(default)]
    pub quiz_requested: bool,
    /// Record-level override that keeps the module attemptable.
    #[serde(default)]
    pub is_authorized: bool,
    /// Last mutation, microseconds since Unix epoch.
    #[serde(default)]
    pub updated_at: u64,
}

impl ProgressRecord {
    /// A fresh record: score 0, no attempts, not passed.
    pub fn new(student_id: StudentId, module_id: ModuleId) -> Self {
        Self {
            student_id,
            module_id,
            score: 0.0,
            attempts: 0,
            passed: false,
            quiz_requested: false,
            is_authorized: false,
            updated_at: 0,
        }
    }

    /// Out of attempts without a pass. Ignores allow-list and override.
    pub fn is_exhausted(&self, max_attempts: u32) -> bool {
        self.attempts >= max_attempts && !self.passed
    }

    /// Apply the re-evaluation reset: attempts, score, pass and request
    /// flag return to their initial values.
    pub fn reset(&mut self, now: u64) {
        self.attempts = 0;
        self.passed = false;
        self.score = 0.0;
        self.quiz_requested = false;
        self.updated_at = now;
    }
}
