//! Resilience tests: corrupted documents, sparse documents, hostile ids
//! and invalid input never panic or leave partial state behind.

use course_progress::{
    build_transcript, can_attempt, submit_attempt, CourseId, ErrorClass, FileStore, Module,
    ModuleId, PolicyConfig, ProgressError, RecordStore, StudentId,
};

fn seeded(dir: &std::path::Path) -> FileStore {
    let store = FileStore::new(dir).unwrap();
    store
        .put_module(&Module::new("m1", "c1", "Safety", 1, 50))
        .unwrap();
    store
}

#[test]
fn resilience_corrupted_module_file_detected() {
    let tmp = tempfile::tempdir().unwrap();
    let store = seeded(tmp.path());

    std::fs::write(tmp.path().join("modules").join("m1.json"), b"{ not json").unwrap();

    let err = store.list_modules(&CourseId::new("c1")).unwrap_err();
    assert!(matches!(err, ProgressError::InvalidFileFormat(_)));
    assert_eq!(err.class(), ErrorClass::Persistence);
    assert!(store.get_module(&ModuleId::new("m1")).is_err());
}

#[test]
fn resilience_truncated_record_file_detected() {
    let tmp = tempfile::tempdir().unwrap();
    let store = seeded(tmp.path());
    let policy = PolicyConfig::default();
    let s = StudentId::new("s1");
    let m = ModuleId::new("m1");
    submit_attempt(&store, &policy, &s, &m, 40.0).unwrap();

    let path = tmp.path().join("progress").join("s1").join("m1.json");
    let data = std::fs::read(&path).unwrap();
    std::fs::write(&path, &data[..data.len() / 2]).unwrap();

    assert!(matches!(
        store.get_record(&s, &m),
        Err(ProgressError::InvalidFileFormat(_))
    ));
    assert!(submit_attempt(&store, &policy, &s, &m, 60.0).is_err());
    assert!(can_attempt(&store, &policy, &s, &m).is_err());
}

#[test]
fn resilience_sparse_documents_take_defaults() {
    let tmp = tempfile::tempdir().unwrap();
    let store = FileStore::new(tmp.path()).unwrap();

    std::fs::write(
        tmp.path().join("modules").join("m1.json"),
        br#"{"version":1,"module":{"id":"m1","course_id":"c1","title":"Safety","order":1,"pass_mark":50}}"#,
    )
    .unwrap();
    std::fs::create_dir_all(tmp.path().join("progress").join("s1")).unwrap();
    std::fs::write(
        tmp.path().join("progress").join("s1").join("m1.json"),
        br#"{"version":1,"revision":4,"record":{"student_id":"s1","module_id":"m1","attempts":2}}"#,
    )
    .unwrap();

    let module = store.get_module(&ModuleId::new("m1")).unwrap().unwrap();
    assert!(!module.is_final_assessment);
    assert!(module.allow_list.is_empty());

    let s = StudentId::new("s1");
    let m = ModuleId::new("m1");
    let loaded = store.get_record(&s, &m).unwrap().unwrap();
    assert_eq!(loaded.revision, 4);
    assert_eq!(loaded.value.attempts, 2);
    assert!(!loaded.value.passed);
    assert_eq!(loaded.value.score, 0.0);

    // The third and last attempt is still available.
    let policy = PolicyConfig::default();
    let record = submit_attempt(&store, &policy, &s, &m, 75.0).unwrap();
    assert_eq!(record.attempts, 3);
    assert_eq!(store.get_record(&s, &m).unwrap().unwrap().revision, 5);
}

#[test]
fn resilience_path_like_ids_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let store = seeded(tmp.path());
    let policy = PolicyConfig::default();

    for bad in ["../escape", "a/b", "..", "back\\slash"] {
        let err = submit_attempt(
            &store,
            &policy,
            &StudentId::new(bad),
            &ModuleId::new("m1"),
            50.0,
        )
        .unwrap_err();
        assert!(matches!(err, ProgressError::Validation(_)), "{bad}: {err}");

        let module = Module::new(bad, "c1", "Bad", 9, 50);
        assert!(store.put_module(&module).is_err(), "{bad}");
    }

    // Nothing escaped the store directory.
    assert!(!tmp.path().parent().unwrap().join("escape").exists());
    assert!(!tmp.path().join("progress").join("..").join("escape").exists());
}

#[test]
fn resilience_invalid_scores_write_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let store = seeded(tmp.path());
    let policy = PolicyConfig::default();
    let s = StudentId::new("s1");
    let m = ModuleId::new("m1");

    for score in [-0.5, 100.01, f64::NAN, f64::INFINITY] {
        let err = submit_attempt(&store, &policy, &s, &m, score).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Validation);
    }
    assert!(store.get_record(&s, &m).unwrap().is_none());
    assert!(!tmp.path().join("progress").join("s1").exists());
}

#[test]
fn resilience_unknown_module_reported() {
    let tmp = tempfile::tempdir().unwrap();
    let store = seeded(tmp.path());
    let policy = PolicyConfig::default();

    let err = submit_attempt(
        &store,
        &policy,
        &StudentId::new("s1"),
        &ModuleId::new("ghost"),
        50.0,
    )
    .unwrap_err();
    assert!(matches!(err, ProgressError::UnknownModule(_)));
}

#[test]
fn resilience_state_survives_reopen() {
    let tmp = tempfile::tempdir().unwrap();
    let policy = PolicyConfig::default();
    let s = StudentId::new("s1");
    let m = ModuleId::new("m1");

    {
        let store = seeded(tmp.path());
        submit_attempt(&store, &policy, &s, &m, 30.0).unwrap();
        submit_attempt(&store, &policy, &s, &m, 35.0).unwrap();
    }

    let store = FileStore::new(tmp.path()).unwrap();
    let record = submit_attempt(&store, &policy, &s, &m, 45.0).unwrap();
    assert_eq!(record.attempts, 3);
    assert!(!can_attempt(&store, &policy, &s, &m).unwrap());

    let transcript = build_transcript(&store, &s, &CourseId::new("c1")).unwrap();
    assert_eq!(transcript.rows.len(), 1);
    assert_eq!(transcript.rows[0].attempts, 3);
}

#[test]
fn resilience_empty_store_reports_empty_course() {
    let tmp = tempfile::tempdir().unwrap();
    let store = FileStore::new(tmp.path()).unwrap();
    let transcript =
        build_transcript(&store, &StudentId::new("s1"), &CourseId::new("nothing")).unwrap();
    assert!(transcript.rows.is_empty());
    assert_eq!(transcript.final_average, 0.0);
}
