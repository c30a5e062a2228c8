//! Data structures for transcripts.

use serde::{Deserialize, Serialize};

use crate::model::{CourseId, ModuleId, StudentId};

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// Per-module decision printed on the transcript.
///
/// `NotCompetent` marks a pass that needed more than one attempt, not a
/// failure; unpassed modules show `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    #[serde(rename = "COMPETENT")]
    Competent,
    #[serde(rename = "NOT COMPETENT")]
    NotCompetent,
    #[serde(rename = "-")]
    Pending,
}

impl Decision {
    pub fn label(&self) -> &'static str {
        match self {
            Decision::Competent => "COMPETENT",
            Decision::NotCompetent => "NOT COMPETENT",
            Decision::Pending => "-",
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Grade band
// ---------------------------------------------------------------------------

/// Grade band derived from the final average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GradeBand {
    #[serde(rename = "EXCELLENT")]
    Excellent,
    #[serde(rename = "VERY GOOD")]
    VeryGood,
    #[serde(rename = "PASS")]
    Pass,
}

impl GradeBand {
    pub fn label(&self) -> &'static str {
        match self {
            GradeBand::Excellent => "EXCELLENT",
            GradeBand::VeryGood => "VERY GOOD",
            GradeBand::Pass => "PASS",
        }
    }
}

impl std::fmt::Display for GradeBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Transcript
// ---------------------------------------------------------------------------

/// One module line of the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptRow {
    pub module_id: ModuleId,
    pub title: String,
    pub score: f64,
    pub attempts: u32,
    pub decision: Decision,
}

/// The printable academic record of one student in one course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub student_id: StudentId,
    pub course_id: CourseId,
    /// Rows in course order.
    pub rows: Vec<TranscriptRow>,
    /// Mean score over every module, final assessment included.
    pub final_average: f64,
    pub grade: GradeBand,
}

impl std::fmt::Display for Transcript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let width = self
            .rows
            .iter()
            .map(|r| r.title.chars().count())
            .max()
            .unwrap_or(0)
            .max("Final average".len());

        writeln!(f, "Transcript: {} / {}", self.student_id, self.course_id)?;
        writeln!(f, "  {:<width$}  {:>6}  Decision", "Module", "Score")?;
        for row in &self.rows {
            writeln!(
                f,
                "  {:<width$}  {:>6.1}  {}",
                row.title, row.score, row.decision
            )?;
        }
        write!(
            f,
            "  {:<width$}  {:>6.1}  {}",
            "Final average", self.final_average, self.grade
        )
    }
}
