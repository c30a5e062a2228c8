//! Filesystem-backed record store.
//!
//! Stores modules and progress records as JSON documents under a
//! directory tree:
//!
//! ```text
//! {base_dir}/
//! ├── modules/
//! │   └── {module_id}.json
//! └── progress/
//!     └── {student_id}/
//!         └── {module_id}.json
//! ```
//!
//! File format for modules:
//! ```json
//! { "version": 1, "module": { ... Module ... } }
//! ```
//!
//! File format for progress records:
//! ```json
//! { "version": 1, "revision": 3, "record": { ... ProgressRecord ... } }
//! ```
//!
//! Every document write goes through a sibling temp file and a rename, so
//! readers never see a torn document. Compare-and-swap writes and
//! transactions serialize through an in-process lock; the store is safe
//! for one process, concurrent writers in other processes are not
//! coordinated.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::error::{ProgressError, Result};
use crate::model::{CourseId, Module, ModuleId, ProgressRecord, StudentId, Versioned};

use super::{sort_modules, FailPoint, FailPoints, RecordStore, StoreTransaction, WriteOutcome};

// ── File format constants ─────────────────────────────────────────────────────

const STORE_FILE_VERSION: u32 = 1;

const MODULES_DIR: &str = "modules";
const PROGRESS_DIR: &str = "progress";

// ── On-disk structures ────────────────────────────────────────────────────────

/// Wrapper written to disk for each module.
#[derive(Debug, Serialize, Deserialize)]
struct ModuleFile {
    version: u32,
    module: Module,
}

/// Wrapper written to disk for each progress record.
#[derive(Debug, Serialize, Deserialize)]
struct RecordFile {
    version: u32,
    /// Compare-and-swap revision, bumped on every committed write.
    revision: u64,
    record: ProgressRecord,
}

/// A document write prepared by a transaction, not yet applied.
struct PendingWrite {
    path: PathBuf,
    bytes: Vec<u8>,
    point: FailPoint,
}

// ── FileStore ─────────────────────────────────────────────────────────────────

/// `RecordStore` persisting JSON documents under `base_dir`.
pub struct FileStore {
    base_dir: PathBuf,
    write_lock: Mutex<()>,
    fail_points: FailPoints,
}

impl FileStore {
    /// Create a new `FileStore` rooted at `base_dir`.
    ///
    /// Creates `modules/` and `progress/` if they do not already exist.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Io` if any directory cannot be created.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(base_dir.join(MODULES_DIR))?;
        std::fs::create_dir_all(base_dir.join(PROGRESS_DIR))?;
        Ok(Self {
            base_dir,
            write_lock: Mutex::new(()),
            fail_points: FailPoints::default(),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Make the next document write of the given kind fail with `Persistence`.
    pub fn inject_fault(&self, point: FailPoint) {
        self.fail_points.arm(point);
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| ProgressError::Persistence("file store lock poisoned".into()))
    }

    // ── Paths ─────────────────────────────────────────────────────────────────

    fn module_path(&self, id: &ModuleId) -> Result<PathBuf> {
        Ok(self
            .base_dir
            .join(MODULES_DIR)
            .join(format!("{}.json", file_component(id.as_str())?)))
    }

    fn record_path(&self, student: &StudentId, module: &ModuleId) -> Result<PathBuf> {
        Ok(self
            .base_dir
            .join(PROGRESS_DIR)
            .join(file_component(student.as_str())?)
            .join(format!("{}.json", file_component(module.as_str())?)))
    }

    // ── Document I/O ──────────────────────────────────────────────────────────

    fn read_module(&self, id: &ModuleId) -> Result<Option<Module>> {
        let path = self.module_path(id)?;
        if !path.exists() {
            return Ok(None);
        }
        read_module_file(&path).map(Some)
    }

    fn read_record(
        &self,
        student: &StudentId,
        module: &ModuleId,
    ) -> Result<Option<Versioned<ProgressRecord>>> {
        let path = self.record_path(student, module)?;
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&path)?;
        let file: RecordFile = serde_json::from_slice(&bytes).map_err(|e| {
            ProgressError::InvalidFileFormat(format!(
                "failed to parse progress file {}: {e}",
                path.display()
            ))
        })?;
        Ok(Some(Versioned::new(file.revision, file.record)))
    }

    fn module_write(&self, module: &Module) -> Result<PendingWrite> {
        let file = ModuleFile {
            version: STORE_FILE_VERSION,
            module: module.clone(),
        };
        Ok(PendingWrite {
            path: self.module_path(&module.id)?,
            bytes: to_json(&file)?,
            point: FailPoint::AllowListWrite,
        })
    }

    fn record_write(&self, record: &ProgressRecord, revision: u64) -> Result<PendingWrite> {
        let file = RecordFile {
            version: STORE_FILE_VERSION,
            revision,
            record: record.clone(),
        };
        Ok(PendingWrite {
            path: self.record_path(&record.student_id, &record.module_id)?,
            bytes: to_json(&file)?,
            point: FailPoint::RecordWrite,
        })
    }

    fn apply(&self, write: &PendingWrite) -> Result<()> {
        self.fail_points.trip(write.point)?;
        write_atomic(&write.path, &write.bytes)
    }

    /// Apply staged writes in order; undo the applied ones if any fails.
    ///
    /// Every target is backed up before the first write lands, so a backup
    /// that cannot be read aborts the commit with nothing applied.
    fn commit(&self, writes: Vec<PendingWrite>) -> Result<()> {
        let mut backups: Vec<Option<Vec<u8>>> = Vec::with_capacity(writes.len());
        for write in &writes {
            backups.push(read_backup(&write.path).map_err(|e| {
                log::warn!(
                    "transaction aborted, cannot back up {}: {e}",
                    write.path.display()
                );
                ProgressError::Persistence(format!("transaction aborted before commit: {e}"))
            })?);
        }

        let mut applied: Vec<(PathBuf, Option<Vec<u8>>)> = Vec::with_capacity(writes.len());
        for (write, backup) in writes.iter().zip(backups) {
            if let Err(e) = self.apply(write) {
                log::warn!(
                    "transaction write to {} failed, rolling back {} applied write(s): {e}",
                    write.path.display(),
                    applied.len()
                );
                self.rollback(applied);
                return Err(ProgressError::Persistence(format!(
                    "transaction rolled back: {e}"
                )));
            }
            applied.push((write.path.clone(), backup));
        }
        Ok(())
    }

    fn rollback(&self, applied: Vec<(PathBuf, Option<Vec<u8>>)>) {
        for (path, backup) in applied.into_iter().rev() {
            let restored = match backup {
                Some(bytes) => write_atomic(&path, &bytes),
                None => std::fs::remove_file(&path).map_err(ProgressError::from),
            };
            if let Err(e) = restored {
                log::error!("failed to restore {} during rollback: {e}", path.display());
            }
        }
    }

    fn student_dirs(&self) -> Result<Vec<StudentId>> {
        let mut students = Vec::new();
        for entry in std::fs::read_dir(self.base_dir.join(PROGRESS_DIR))? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                students.push(StudentId::new(entry.file_name().to_string_lossy()));
            }
        }
        students.sort();
        Ok(students)
    }

    fn all_modules(&self) -> Result<Vec<Module>> {
        let mut modules = Vec::new();
        for entry in std::fs::read_dir(self.base_dir.join(MODULES_DIR))? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                modules.push(read_module_file(&path)?);
            }
        }
        Ok(modules)
    }
}

impl RecordStore for FileStore {
    fn get_record(
        &self,
        student: &StudentId,
        module: &ModuleId,
    ) -> Result<Option<Versioned<ProgressRecord>>> {
        self.read_record(student, module)
    }

    fn put_record(
        &self,
        record: &ProgressRecord,
        expected: Option<u64>,
    ) -> Result<WriteOutcome> {
        let _guard = self.lock()?;
        let current = self
            .read_record(&record.student_id, &record.module_id)?
            .map(|v| v.revision);
        if current != expected {
            return Ok(WriteOutcome::Conflict { current });
        }
        let revision = current.unwrap_or(0) + 1;
        self.apply(&self.record_write(record, revision)?)?;
        Ok(WriteOutcome::Committed { revision })
    }

    fn list_records(
        &self,
        student: &StudentId,
        course: &CourseId,
    ) -> Result<Vec<ProgressRecord>> {
        let mut records = Vec::new();
        for module in self.list_modules(course)? {
            if let Some(v) = self.read_record(student, &module.id)? {
                records.push(v.value);
            }
        }
        Ok(records)
    }

    fn list_course_records(&self, course: &CourseId) -> Result<Vec<ProgressRecord>> {
        let modules = self.list_modules(course)?;
        let mut records = Vec::new();
        for student in self.student_dirs()? {
            for module in &modules {
                if let Some(v) = self.read_record(&student, &module.id)? {
                    records.push(v.value);
                }
            }
        }
        Ok(records)
    }

    fn get_module(&self, module: &ModuleId) -> Result<Option<Module>> {
        self.read_module(module)
    }

    fn list_modules(&self, course: &CourseId) -> Result<Vec<Module>> {
        let mut modules: Vec<Module> = self
            .all_modules()?
            .into_iter()
            .filter(|m| &m.course_id == course)
            .collect();
        sort_modules(&mut modules);
        Ok(modules)
    }

    fn put_module(&self, module: &Module) -> Result<()> {
        module.validate()?;
        let write = self.module_write(module)?;
        let _guard = self.lock()?;
        write_atomic(&write.path, &write.bytes)
    }

    fn add_to_allow_list(&self, module: &ModuleId, student: &StudentId) -> Result<()> {
        let _guard = self.lock()?;
        let mut entry = self
            .read_module(module)?
            .ok_or_else(|| ProgressError::UnknownModule(module.clone()))?;
        entry.allow_list.insert(student.clone());
        self.apply(&self.module_write(&entry)?)
    }

    fn with_transaction(
        &self,
        f: &mut dyn FnMut(&mut dyn StoreTransaction) -> Result<()>,
    ) -> Result<()> {
        let _guard = self.lock()?;
        let mut tx = FileTransaction {
            store: self,
            records: BTreeMap::new(),
            modules: BTreeMap::new(),
        };
        f(&mut tx)?;

        // Encode everything before touching disk; records go first.
        let mut writes = Vec::with_capacity(tx.records.len() + tx.modules.len());
        for record in tx.records.values() {
            let current = self
                .read_record(&record.student_id, &record.module_id)?
                .map(|v| v.revision)
                .unwrap_or(0);
            writes.push(self.record_write(record, current + 1)?);
        }
        for module in tx.modules.values() {
            writes.push(self.module_write(module)?);
        }
        self.commit(writes)
    }
}

/// Transaction staging writes in memory until commit.
struct FileTransaction<'a> {
    store: &'a FileStore,
    records: BTreeMap<(StudentId, ModuleId), ProgressRecord>,
    modules: BTreeMap<ModuleId, Module>,
}

impl StoreTransaction for FileTransaction<'_> {
    fn get_record(
        &self,
        student: &StudentId,
        module: &ModuleId,
    ) -> Result<Option<ProgressRecord>> {
        if let Some(staged) = self.records.get(&(student.clone(), module.clone())) {
            return Ok(Some(staged.clone()));
        }
        Ok(self.store.read_record(student, module)?.map(|v| v.value))
    }

    fn put_record(&mut self, record: &ProgressRecord) -> Result<()> {
        // Reject unusable ids now rather than at commit.
        self.store
            .record_path(&record.student_id, &record.module_id)?;
        self.records.insert(
            (record.student_id.clone(), record.module_id.clone()),
            record.clone(),
        );
        Ok(())
    }

    fn get_module(&self, module: &ModuleId) -> Result<Option<Module>> {
        if let Some(staged) = self.modules.get(module) {
            return Ok(Some(staged.clone()));
        }
        self.store.read_module(module)
    }

    fn add_to_allow_list(&mut self, module: &ModuleId, student: &StudentId) -> Result<()> {
        let mut entry = self
            .get_module(module)?
            .ok_or_else(|| ProgressError::UnknownModule(module.clone()))?;
        entry.allow_list.insert(student.clone());
        self.modules.insert(module.clone(), entry);
        Ok(())
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Reject identifiers that would escape or alias the store directory.
fn file_component(id: &str) -> Result<&str> {
    if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\', '\0']) {
        return Err(ProgressError::Validation(format!(
            "identifier {id:?} cannot be used as a document name"
        )));
    }
    Ok(id)
}

/// Current bytes of `path`, or `None` if it does not exist yet.
fn read_backup(path: &Path) -> Result<Option<Vec<u8>>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn read_module_file(path: &Path) -> Result<Module> {
    let bytes = std::fs::read(path)?;
    let file: ModuleFile = serde_json::from_slice(&bytes).map_err(|e| {
        ProgressError::InvalidFileFormat(format!(
            "failed to parse module file {}: {e}",
            path.display()
        ))
    })?;
    Ok(file.module)
}

fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(value).map_err(|e| ProgressError::Serialization(e.to_string()))
}

/// Write `data` to `path` atomically using a sibling temporary file.
///
/// Creates the parent directory if it does not exist.
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, data)?;
    std::fs::rename(&tmp_path, path)?;

    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
