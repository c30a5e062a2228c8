//! Typed records exchanged with the record store.
//!
//! The model module provides:
//! - String-backed identifiers for students, modules and courses
//! - The [`Module`] catalog entry with its per-student allow-list
//! - The per-student-per-module [`ProgressRecord`]
//! - [`Versioned`], the revision wrapper used for compare-and-swap writes

pub mod module;
pub mod record;

use serde::{Deserialize, Serialize};

pub use module::Module;
pub use record::ProgressRecord;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the raw identifier.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id!(
    /// Student identifier (the portal's user uid).
    StudentId
);
string_id!(
    /// Module identifier, unique across all courses.
    ModuleId
);
string_id!(
    /// Course identifier.
    CourseId
);

// ---------------------------------------------------------------------------
// Versioned
// ---------------------------------------------------------------------------

/// A stored value together with the store revision it was read at.
///
/// Revisions start at 1 on first write and increase by one on every
/// committed write of the same document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub revision: u64,
    pub value: T,
}

impl<T> Versioned<T> {
    pub fn new(revision: u64, value: T) -> Self {
        Self { revision, value }
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}
