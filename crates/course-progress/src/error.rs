//! Error types for course-progress.
//!
//! All errors are strongly typed and propagated without panicking. Each
//! variant belongs to one [`ErrorClass`], which tells the caller how to
//! react (fix the input, redirect to re-evaluation, retry, or report).

use crate::model::{ModuleId, StudentId};

/// Progress error types covering all operations.
#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Unknown module: {0}")]
    UnknownModule(ModuleId),

    #[error("Student {student} is not authorized to attempt module {module}")]
    Unauthorized { student: StudentId, module: ModuleId },

    #[error("Concurrent update on {student}/{module} not resolved after {retries} retries")]
    Concurrency {
        student: StudentId,
        module: ModuleId,
        retries: u32,
    },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid file format: {0}")]
    InvalidFileFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse error taxonomy exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed input. Never retried.
    Validation,
    /// Attempt while locked. Caller should offer the re-evaluation flow.
    Authorization,
    /// Lost update after bounded retries. The whole operation may be retried.
    Concurrency,
    /// Store unavailable or transaction failed.
    Persistence,
}

impl ProgressError {
    /// Which taxonomy class this error belongs to.
    pub fn class(&self) -> ErrorClass {
        match self {
            ProgressError::Validation(_) | ProgressError::UnknownModule(_) => {
                ErrorClass::Validation
            }
            ProgressError::Unauthorized { .. } => ErrorClass::Authorization,
            ProgressError::Concurrency { .. } => ErrorClass::Concurrency,
            ProgressError::Persistence(_)
            | ProgressError::Serialization(_)
            | ProgressError::InvalidFileFormat(_)
            | ProgressError::Io(_) => ErrorClass::Persistence,
        }
    }

    /// Only lost-update conflicts are safe for the caller to retry blindly.
    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Concurrency
    }
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, ProgressError>;
