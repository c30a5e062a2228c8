//! Course module — one gradable unit of the curriculum.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{ProgressError, Result};

use super::{CourseId, ModuleId, StudentId};

/// A module in a course catalog.
///
/// `allow_list` holds students an administrator has re-authorized after
/// they locked the module. Membership is only ever added, never removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub id: ModuleId,
    pub course_id: CourseId,
    pub title: String,
    /// Position in the course; lower comes first.
    pub order: u32,
    /// Minimum score (0-100) that passes the module quiz.
    pub pass_mark: u8,
    #[serde(default)]
    pub is_final_assessment: bool,
    #[serde(default)]
    pub allow_list: BTreeSet<StudentId>,
}

impl Module {
    /// Create a regular (non-final) module with an empty allow-list.
    pub fn new(
        id: impl Into<String>,
        course_id: impl Into<String>,
        title: impl Into<String>,
        order: u32,
        pass_mark: u8,
    ) -> Self {
        Self {
            id: ModuleId::new(id),
            course_id: CourseId::new(course_id),
            title: title.into(),
            order,
            pass_mark,
            is_final_assessment: false,
            allow_list: BTreeSet::new(),
        }
    }

    /// Mark this module as the course's final assessment.
    pub fn final_assessment(mut self) -> Self {
        self.is_final_assessment = true;
        self
    }

    /// Whether `student` has been re-authorized for this module.
    pub fn allows(&self, student: &StudentId) -> bool {
        self.allow_list.contains(student)
    }

    /// Check the authoring constraints on a module.
    pub fn validate(&self) -> Result<()> {
        if self.id.as_str().trim().is_empty() {
            return Err(ProgressError::Validation("module id is empty".into()));
        }
        if self.course_id.as_str().trim().is_empty() {
            return Err(ProgressError::Validation(format!(
                "module {} has an empty course id",
                self.id
            )));
        }
        if self.title.trim().is_empty() {
            return Err(ProgressError::Validation(format!(
                "module {} has an empty title",
                self.id
            )));
        }
        if self.pass_mark > 100 {
            return Err(ProgressError::Validation(format!(
                "pass mark must be 0-100, got {}",
                self.pass_mark
            )));
        }
        Ok(())
    }
}
