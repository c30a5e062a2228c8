//! Integration test: full end-to-end course workflow.
//!
//! Tests the complete lifecycle:
//! 1. Author a course with a final assessment
//! 2. Submit quiz attempts until a module locks
//! 3. Request and grant re-evaluation
//! 4. Pass on the re-authorized attempt
//! 5. Compute standing, transcript and certificate eligibility

use course_progress::{
    build_transcript, can_attempt, compute_standing, grant_access, is_course_finished,
    list_locked_modules, list_pending_requests, request_reevaluation, submit_attempt, CourseId,
    Decision, FileStore, GradeBand, MemoryStore, Module, ModuleId, PolicyConfig, ProgressError,
    RecordStore, StudentId,
};

fn author_course(store: &dyn RecordStore) {
    store
        .put_module(&Module::new("safety", "carpentry", "Workshop Safety", 1, 50))
        .unwrap();
    store
        .put_module(&Module::new("tools", "carpentry", "Hand Tools", 2, 60))
        .unwrap();
    store
        .put_module(&Module::new("exam", "carpentry", "Final Exam", 3, 70).final_assessment())
        .unwrap();
}

fn run_workflow(store: &dyn RecordStore) {
    let policy = PolicyConfig::default();
    let course = CourseId::new("carpentry");
    let alice = StudentId::new("alice");
    let safety = ModuleId::new("safety");
    let tools = ModuleId::new("tools");
    let exam = ModuleId::new("exam");

    author_course(store);

    // ── Step 1: Fail, fail, pass on the safety module ─────────────────────
    for score in [40.0, 45.0, 55.0] {
        submit_attempt(store, &policy, &alice, &safety, score).unwrap();
    }
    let safety_record = store.get_record(&alice, &safety).unwrap().unwrap().value;
    assert_eq!(safety_record.attempts, 3);
    assert!(safety_record.passed);

    // ── Step 2: Exhaust the tools module ──────────────────────────────────
    for score in [10.0, 20.0, 30.0] {
        submit_attempt(store, &policy, &alice, &tools, score).unwrap();
    }
    assert!(!can_attempt(store, &policy, &alice, &tools).unwrap());
    let err = submit_attempt(store, &policy, &alice, &tools, 99.0).unwrap_err();
    assert!(matches!(err, ProgressError::Unauthorized { .. }));

    let locked = list_locked_modules(store, &policy, &alice, &course).unwrap();
    assert_eq!(locked.len(), 1);
    assert_eq!(locked[0].id, tools);

    // ── Step 3: Request and grant re-evaluation ───────────────────────────
    request_reevaluation(store, &policy, &alice, &tools).unwrap();
    let pending = list_pending_requests(store, &policy, &course).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].student_id, alice);

    assert!(grant_access(store, &policy, &alice, &tools).unwrap().is_granted());
    assert!(list_pending_requests(store, &policy, &course).unwrap().is_empty());
    assert!(can_attempt(store, &policy, &alice, &tools).unwrap());
    assert!(store.get_module(&tools).unwrap().unwrap().allows(&alice));

    // ── Step 4: Pass tools first try after the reset, sit the exam ────────
    let tools_record = submit_attempt(store, &policy, &alice, &tools, 80.0).unwrap();
    assert_eq!(tools_record.attempts, 1);
    assert!(tools_record.passed);
    submit_attempt(store, &policy, &alice, &exam, 90.0).unwrap();

    // ── Step 5: Reporting ─────────────────────────────────────────────────
    let transcript = build_transcript(store, &alice, &course).unwrap();
    let decisions: Vec<Decision> = transcript.rows.iter().map(|r| r.decision).collect();
    assert_eq!(
        decisions,
        vec![Decision::NotCompetent, Decision::Competent, Decision::Competent]
    );
    // (55 + 80 + 90) / 3
    assert!((transcript.final_average - 75.0).abs() < 1e-9);
    assert_eq!(transcript.grade, GradeBand::VeryGood);

    // (55 + 80) / 2, exam excluded
    let standing = compute_standing(store, &policy, &alice, &course).unwrap();
    assert!((standing.average_score - 67.5).abs() < 1e-9);
    assert!(standing.fee_required);

    assert!(is_course_finished(store, &alice, &course).unwrap());
}

#[test]
fn full_workflow_in_memory() {
    let store = MemoryStore::new();
    run_workflow(&store);
}

#[test]
fn full_workflow_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path()).unwrap();
    run_workflow(&store);

    // A fresh handle over the same directory sees the same state.
    let reopened = FileStore::new(dir.path()).unwrap();
    let transcript = build_transcript(
        &reopened,
        &StudentId::new("alice"),
        &CourseId::new("carpentry"),
    )
    .unwrap();
    assert_eq!(transcript.rows.len(), 3);
}

#[test]
fn averages_diverge_when_final_assessment_present() {
    let store = MemoryStore::with_modules([
        Module::new("m1", "c", "Module One", 1, 50),
        Module::new("final", "c", "Final Assessment", 2, 50).final_assessment(),
    ])
    .unwrap();
    let policy = PolicyConfig::default();
    let s = StudentId::new("s1");
    let c = CourseId::new("c");

    submit_attempt(&store, &policy, &s, &ModuleId::new("m1"), 90.0).unwrap();
    submit_attempt(&store, &policy, &s, &ModuleId::new("final"), 100.0).unwrap();

    let standing = compute_standing(&store, &policy, &s, &c).unwrap();
    let transcript = build_transcript(&store, &s, &c).unwrap();
    assert_eq!(standing.average_score, 90.0);
    assert_eq!(transcript.final_average, 95.0);
    assert_ne!(standing.average_score, transcript.final_average);
}

#[test]
fn failing_scores_still_finish_course() {
    let store = MemoryStore::with_modules([
        Module::new("m1", "c", "One", 1, 50),
        Module::new("m2", "c", "Two", 2, 50),
    ])
    .unwrap();
    let policy = PolicyConfig::default();
    let s = StudentId::new("s1");

    submit_attempt(&store, &policy, &s, &ModuleId::new("m1"), 30.0).unwrap();
    submit_attempt(&store, &policy, &s, &ModuleId::new("m2"), 40.0).unwrap();

    assert!(is_course_finished(&store, &s, &CourseId::new("c")).unwrap());
    let transcript = build_transcript(&store, &s, &CourseId::new("c")).unwrap();
    assert!(transcript.rows.iter().all(|r| r.decision == Decision::Pending));
}

#[test]
fn attempts_monotonic_between_resets() {
    let store = MemoryStore::with_modules([Module::new("m1", "c", "One", 1, 100)]).unwrap();
    let policy = PolicyConfig::default();
    let s = StudentId::new("s1");
    let m = ModuleId::new("m1");

    for expected in 1..=3 {
        let r = submit_attempt(&store, &policy, &s, &m, 10.0).unwrap();
        assert_eq!(r.attempts, expected);
    }
    assert!(submit_attempt(&store, &policy, &s, &m, 10.0).is_err());

    grant_access(&store, &policy, &s, &m).unwrap();
    assert_eq!(store.get_record(&s, &m).unwrap().unwrap().value.attempts, 0);

    // Allow-list membership is permanent, so attempts continue past the
    // limit after a grant, still one at a time.
    for expected in 1..=5 {
        let r = submit_attempt(&store, &policy, &s, &m, 10.0).unwrap();
        assert_eq!(r.attempts, expected);
    }
}
