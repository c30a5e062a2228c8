//! Grade Report — author a short course, run a student through it, lock a
//! module, grant a re-evaluation, and print the transcript.
//!
//! Run with:
//!   cargo run --example grade_report -p course-progress

use course_progress::{
    build_transcript, can_attempt, compute_standing, grant_access, is_course_finished,
    list_locked_modules, request_reevaluation, submit_attempt, CourseId, MemoryStore, Module,
    ModuleId, PolicyConfig, StudentId,
};

fn main() {
    let policy = PolicyConfig::default();
    let course = CourseId::new("electrical-101");
    let student = StudentId::new("sam");

    // ── 1. Author the course ────────────────────────────────────────────────
    //
    // Modules are ordered by `order`; the final assessment is excluded from
    // the running average but counts toward the transcript average.
    let store = MemoryStore::with_modules([
        Module::new("circuits", "electrical-101", "Basic Circuits", 1, 60),
        Module::new("wiring", "electrical-101", "Domestic Wiring", 2, 65),
        Module::new("final", "electrical-101", "Final Assessment", 3, 70).final_assessment(),
    ])
    .expect("course modules should be valid");

    // ── 2. Pass the first module at the first attempt ───────────────────────
    let circuits = ModuleId::new("circuits");
    let r = submit_attempt(&store, &policy, &student, &circuits, 82.0)
        .expect("first submission should be accepted");
    println!("{}: score {:.1}, passed {}", r.module_id, r.score, r.passed);

    // ── 3. Fail the second module until it locks ────────────────────────────
    let wiring = ModuleId::new("wiring");
    for score in [40.0, 52.0, 61.0] {
        let r = submit_attempt(&store, &policy, &student, &wiring, score)
            .expect("attempt within the limit should be accepted");
        println!(
            "{}: attempt {} of {}, score {:.1}",
            r.module_id, r.attempts, policy.max_attempts, r.score
        );
    }
    let locked = list_locked_modules(&store, &policy, &student, &course)
        .expect("locked modules should list");
    println!(
        "Locked: {}",
        locked
            .iter()
            .map(|m| m.id.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!();

    // ── 4. Request and grant a re-evaluation ────────────────────────────────
    //
    // The running average decides whether a re-sit fee applies.
    request_reevaluation(&store, &policy, &student, &wiring)
        .expect("locked module should accept a request");
    let standing = compute_standing(&store, &policy, &student, &course)
        .expect("standing should compute");
    println!(
        "Running average {:.2}; re-sit fee {}",
        standing.average_score,
        if standing.fee_required { "required" } else { "waived" }
    );
    let outcome = grant_access(&store, &policy, &student, &wiring).expect("grant should commit");
    println!("Grant: {}", if outcome.is_granted() { "granted" } else { "not locked" });
    println!(
        "Can attempt wiring again: {}",
        can_attempt(&store, &policy, &student, &wiring).expect("gate should evaluate")
    );
    println!();

    // ── 5. Finish the course ────────────────────────────────────────────────
    submit_attempt(&store, &policy, &student, &wiring, 74.0)
        .expect("re-authorized attempt should be accepted");
    submit_attempt(&store, &policy, &student, &ModuleId::new("final"), 88.0)
        .expect("final assessment should be accepted");

    let transcript = build_transcript(&store, &student, &course).expect("transcript should build");
    println!("{transcript}");
    println!();
    println!(
        "Certificate available: {}",
        is_course_finished(&store, &student, &course).expect("eligibility should evaluate")
    );
}
