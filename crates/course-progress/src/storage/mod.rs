//! Storage layer for modules and progress records.
//!
//! The engines never hold a store of their own; every operation receives a
//! `&dyn RecordStore`. Two implementations are provided:
//!
//! - [`memory_store`] — `Mutex`-guarded maps, used by tests and embedders
//!   that persist elsewhere.
//! - [`file_store`] — JSON documents on disk, one file per module and one
//!   per (student, module) record.
//!
//! # Consistency contract
//!
//! - A single record write is all-or-nothing.
//! - `put_record` is compare-and-swap on the record revision, so two
//!   concurrent submissions cannot both turn `attempts = N` into `N + 1`.
//! - `with_transaction` commits every staged write or none of them.

pub mod file_store;
pub mod memory_store;

use std::collections::BTreeSet;
use std::sync::Mutex;

use crate::error::{ProgressError, Result};
use crate::model::{CourseId, Module, ModuleId, ProgressRecord, StudentId, Versioned};

pub use file_store::FileStore;
pub use memory_store::MemoryStore;

/// Result of a compare-and-swap record write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The write landed; the record now has this revision.
    Committed { revision: u64 },
    /// The stored revision did not match the expected one.
    Conflict { current: Option<u64> },
}

/// Narrow interface onto the document store.
pub trait RecordStore: Send + Sync {
    /// Fetch the record for (student, module), if one was ever written.
    fn get_record(
        &self,
        student: &StudentId,
        module: &ModuleId,
    ) -> Result<Option<Versioned<ProgressRecord>>>;

    /// Write `record` if the stored revision equals `expected`.
    ///
    /// `expected = None` means the record must not exist yet.
    fn put_record(&self, record: &ProgressRecord, expected: Option<u64>)
        -> Result<WriteOutcome>;

    /// All records of `student` for modules of `course`.
    fn list_records(&self, student: &StudentId, course: &CourseId)
        -> Result<Vec<ProgressRecord>>;

    /// All records of every student for modules of `course`.
    fn list_course_records(&self, course: &CourseId) -> Result<Vec<ProgressRecord>>;

    fn get_module(&self, module: &ModuleId) -> Result<Option<Module>>;

    /// Modules of `course`, ordered by `(order, id)`.
    fn list_modules(&self, course: &CourseId) -> Result<Vec<Module>>;

    /// Create or replace a module (course authoring).
    fn put_module(&self, module: &Module) -> Result<()>;

    fn add_to_allow_list(&self, module: &ModuleId, student: &StudentId) -> Result<()>;

    /// Run `f` against a transaction; its writes commit together or not at all.
    ///
    /// If `f` returns an error nothing it staged becomes visible.
    ///
    /// The store holds its write lock while `f` runs. `f` must use only the
    /// `StoreTransaction` handle it is given; calling `RecordStore` methods
    /// on the same store from inside `f` deadlocks.
    fn with_transaction(
        &self,
        f: &mut dyn FnMut(&mut dyn StoreTransaction) -> Result<()>,
    ) -> Result<()>;
}

/// Operations available inside [`RecordStore::with_transaction`].
///
/// Reads observe the transaction's own staged writes.
pub trait StoreTransaction {
    fn get_record(&self, student: &StudentId, module: &ModuleId)
        -> Result<Option<ProgressRecord>>;

    fn put_record(&mut self, record: &ProgressRecord) -> Result<()>;

    fn get_module(&self, module: &ModuleId) -> Result<Option<Module>>;

    fn add_to_allow_list(&mut self, module: &ModuleId, student: &StudentId) -> Result<()>;
}

// ── Fault injection ───────────────────────────────────────────────────────────

/// A write that a store can be told to fail once, for exercising
/// atomicity and rollback paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FailPoint {
    /// The next progress-record write fails.
    RecordWrite,
    /// The next allow-list (module document) write fails.
    AllowListWrite,
}

/// Armed fail points; each trips once.
#[derive(Debug, Default)]
pub(crate) struct FailPoints(Mutex<BTreeSet<FailPoint>>);

impl FailPoints {
    pub(crate) fn arm(&self, point: FailPoint) {
        if let Ok(mut armed) = self.0.lock() {
            armed.insert(point);
        }
    }

    /// Fail with `Persistence` if `point` is armed, disarming it.
    pub(crate) fn trip(&self, point: FailPoint) -> Result<()> {
        let mut armed = self
            .0
            .lock()
            .map_err(|_| ProgressError::Persistence("fail point lock poisoned".into()))?;
        if armed.remove(&point) {
            return Err(ProgressError::Persistence(format!(
                "injected failure at {point:?}"
            )));
        }
        Ok(())
    }
}

/// Order modules the way every listing presents them.
pub(crate) fn sort_modules(modules: &mut [Module]) {
    modules.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
}
