//! In-memory record store.
//!
//! Holds modules and records in `BTreeMap`s behind a single `Mutex`.
//! Transactions run against a staged copy of the whole state which is
//! swapped in only when the transaction body succeeds.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::{ProgressError, Result};
use crate::model::{CourseId, Module, ModuleId, ProgressRecord, StudentId, Versioned};

use super::{sort_modules, FailPoint, FailPoints, RecordStore, StoreTransaction, WriteOutcome};

type RecordKey = (StudentId, ModuleId);

#[derive(Debug, Default, Clone)]
struct State {
    modules: BTreeMap<ModuleId, Module>,
    records: BTreeMap<RecordKey, Versioned<ProgressRecord>>,
}

impl State {
    fn course_module_ids(&self, course: &CourseId) -> Vec<ModuleId> {
        self.modules
            .values()
            .filter(|m| &m.course_id == course)
            .map(|m| m.id.clone())
            .collect()
    }

    fn write_record(&mut self, record: &ProgressRecord) -> u64 {
        let key = (record.student_id.clone(), record.module_id.clone());
        let revision = self.records.get(&key).map(|v| v.revision).unwrap_or(0) + 1;
        self.records
            .insert(key, Versioned::new(revision, record.clone()));
        revision
    }

    fn allow(&mut self, module: &ModuleId, student: &StudentId) -> Result<()> {
        let entry = self
            .modules
            .get_mut(module)
            .ok_or_else(|| ProgressError::UnknownModule(module.clone()))?;
        entry.allow_list.insert(student.clone());
        Ok(())
    }
}

/// `RecordStore` kept entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    fail_points: FailPoints,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with a set of modules.
    pub fn with_modules(modules: impl IntoIterator<Item = Module>) -> Result<Self> {
        let store = Self::new();
        for module in modules {
            store.put_module(&module)?;
        }
        Ok(store)
    }

    /// Make the next write of the given kind fail with `Persistence`.
    pub fn inject_fault(&self, point: FailPoint) {
        self.fail_points.arm(point);
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| ProgressError::Persistence("memory store lock poisoned".into()))
    }
}

impl RecordStore for MemoryStore {
    fn get_record(
        &self,
        student: &StudentId,
        module: &ModuleId,
    ) -> Result<Option<Versioned<ProgressRecord>>> {
        let state = self.lock()?;
        Ok(state
            .records
            .get(&(student.clone(), module.clone()))
            .cloned())
    }

    fn put_record(
        &self,
        record: &ProgressRecord,
        expected: Option<u64>,
    ) -> Result<WriteOutcome> {
        let mut state = self.lock()?;
        let key = (record.student_id.clone(), record.module_id.clone());
        let current = state.records.get(&key).map(|v| v.revision);
        if current != expected {
            return Ok(WriteOutcome::Conflict { current });
        }
        self.fail_points.trip(FailPoint::RecordWrite)?;
        let revision = state.write_record(record);
        Ok(WriteOutcome::Committed { revision })
    }

    fn list_records(
        &self,
        student: &StudentId,
        course: &CourseId,
    ) -> Result<Vec<ProgressRecord>> {
        let state = self.lock()?;
        let records = state
            .course_module_ids(course)
            .into_iter()
            .filter_map(|module| state.records.get(&(student.clone(), module)))
            .map(|v| v.value.clone())
            .collect();
        Ok(records)
    }

    fn list_course_records(&self, course: &CourseId) -> Result<Vec<ProgressRecord>> {
        let state = self.lock()?;
        let modules = state.course_module_ids(course);
        Ok(state
            .records
            .iter()
            .filter(|((_, module), _)| modules.contains(module))
            .map(|(_, v)| v.value.clone())
            .collect())
    }

    fn get_module(&self, module: &ModuleId) -> Result<Option<Module>> {
        Ok(self.lock()?.modules.get(module).cloned())
    }

    fn list_modules(&self, course: &CourseId) -> Result<Vec<Module>> {
        let state = self.lock()?;
        let mut modules: Vec<Module> = state
            .modules
            .values()
            .filter(|m| &m.course_id == course)
            .cloned()
            .collect();
        sort_modules(&mut modules);
        Ok(modules)
    }

    fn put_module(&self, module: &Module) -> Result<()> {
        module.validate()?;
        self.lock()?
            .modules
            .insert(module.id.clone(), module.clone());
        Ok(())
    }

    fn add_to_allow_list(&self, module: &ModuleId, student: &StudentId) -> Result<()> {
        let mut state = self.lock()?;
        self.fail_points.trip(FailPoint::AllowListWrite)?;
        state.allow(module, student)
    }

    fn with_transaction(
        &self,
        f: &mut dyn FnMut(&mut dyn StoreTransaction) -> Result<()>,
    ) -> Result<()> {
        let mut state = self.lock()?;
        let mut tx = MemoryTransaction {
            staged: state.clone(),
            fail_points: &self.fail_points,
        };
        f(&mut tx)?;
        *state = tx.staged;
        Ok(())
    }
}

/// Transaction over a private copy of the store state.
struct MemoryTransaction<'a> {
    staged: State,
    fail_points: &'a FailPoints,
}

impl StoreTransaction for MemoryTransaction<'_> {
    fn get_record(
        &self,
        student: &StudentId,
        module: &ModuleId,
    ) -> Result<Option<ProgressRecord>> {
        Ok(self
            .staged
            .records
            .get(&(student.clone(), module.clone()))
            .map(|v| v.value.clone()))
    }

    fn put_record(&mut self, record: &ProgressRecord) -> Result<()> {
        self.fail_points.trip(FailPoint::RecordWrite)?;
        self.staged.write_record(record);
        Ok(())
    }

    fn get_module(&self, module: &ModuleId) -> Result<Option<Module>> {
        Ok(self.staged.modules.get(module).cloned())
    }

    fn add_to_allow_list(&mut self, module: &ModuleId, student: &StudentId) -> Result<()> {
        self.fail_points.trip(FailPoint::AllowListWrite)?;
        self.staged.allow(module, student)
    }
}
