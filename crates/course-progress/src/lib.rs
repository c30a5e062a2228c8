//! course-progress — Course progression and assessment authorization.
//!
//! Tracks per-student, per-module quiz attempts and pass status, decides
//! when a module locks, lets administrators grant re-evaluation access,
//! and derives transcripts and certificate eligibility from the stored
//! progress records.

pub mod assessment;
pub mod authorization;
pub mod certificate;
pub mod config;
pub mod error;
pub mod model;
pub mod reevaluation;
pub mod storage;
pub mod time;
pub mod transcript;

// Re-export primary types
pub use config::PolicyConfig;
pub use error::{ErrorClass, ProgressError, Result};
pub use model::{CourseId, Module, ModuleId, ProgressRecord, StudentId, Versioned};
pub use storage::{FileStore, MemoryStore, RecordStore, StoreTransaction, WriteOutcome};

// Re-export the caller-facing operations
pub use assessment::submit_attempt;
pub use authorization::{can_attempt, evaluate_access, AccessDecision};
pub use certificate::is_course_finished;
pub use reevaluation::{
    compute_standing, grant_access, list_locked_modules, list_pending_requests,
    request_reevaluation, GrantOutcome, Standing,
};
pub use transcript::{build_transcript, Decision, GradeBand, Transcript, TranscriptRow};
