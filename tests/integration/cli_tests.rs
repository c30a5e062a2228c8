//! Integration tests for the CLI binary.
//!
//! Drives the `cprog` binary against a throwaway store directory.
//!
//! This test is registered as a [[test]] in the course-progress-cli crate
//! so that CARGO_BIN_EXE_cprog is available.

use std::path::Path;
use std::process::{Command, Output};

/// Get a Command pointing to the `cprog` binary.
fn cprog_binary() -> Command {
    Command::new(env!("CARGO_BIN_EXE_cprog"))
}

/// Run `cprog --store <dir> <args...>`.
fn cprog(store: &Path, args: &[&str]) -> Output {
    cprog_binary()
        .arg("--store")
        .arg(store)
        .args(args)
        .env("HOME", store)
        .output()
        .expect("failed to execute cprog")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn ok(store: &Path, args: &[&str]) -> String {
    let output = cprog(store, args);
    assert!(
        output.status.success(),
        "cprog {args:?} failed, stderr: {}",
        stderr(&output)
    );
    stdout(&output)
}

fn author_course(store: &Path) {
    ok(
        store,
        &[
            "module", "add", "--id", "safety", "--course", "carpentry", "--title",
            "Workshop Safety", "--order", "1", "--pass-mark", "50",
        ],
    );
    ok(
        store,
        &[
            "module", "add", "--id", "exam", "--course", "carpentry", "--title", "Final Exam",
            "--order", "2", "--pass-mark", "70", "--final",
        ],
    );
}

#[test]
fn cli_responds_to_help() {
    let output = cprog_binary()
        .arg("--help")
        .output()
        .expect("failed to execute cprog --help");

    assert!(
        output.status.success(),
        "cprog --help should exit with success, stderr: {}",
        stderr(&output)
    );
    let out = stdout(&output);
    assert!(out.contains("Usage"), "got: {out}");
    assert!(out.contains("submit"), "got: {out}");
}

#[test]
fn cli_responds_to_version() {
    let output = cprog_binary()
        .arg("--version")
        .output()
        .expect("failed to execute cprog --version");

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("cprog"), "got: {out}");
    assert!(out.contains(env!("CARGO_PKG_VERSION")), "got: {out}");
}

#[test]
fn cli_exits_with_error_on_unknown_flag() {
    let output = cprog_binary()
        .arg("--nonexistent-flag")
        .output()
        .expect("failed to execute cprog");

    assert!(
        !output.status.success(),
        "cprog with unknown flag should exit with non-zero status"
    );
}

#[test]
fn cli_module_add_and_list() {
    let dir = tempfile::tempdir().unwrap();
    author_course(dir.path());

    let out = ok(dir.path(), &["module", "list", "--course", "carpentry"]);
    let safety = out.find("safety").unwrap();
    let exam = out.find("exam").unwrap();
    assert!(safety < exam, "modules out of order: {out}");
    assert!(out.contains("[final]"));

    let empty = ok(dir.path(), &["module", "list", "--course", "nothing"]);
    assert!(empty.contains("No modules"));
}

#[test]
fn cli_rejects_invalid_pass_mark() {
    let dir = tempfile::tempdir().unwrap();
    let output = cprog(
        dir.path(),
        &[
            "module", "add", "--id", "m1", "--course", "c1", "--title", "Bad", "--order", "1",
            "--pass-mark", "150",
        ],
    );
    assert!(!output.status.success());
    assert!(stderr(&output).contains("error:"));
}

#[test]
fn cli_submit_reports_attempt_and_result() {
    let dir = tempfile::tempdir().unwrap();
    author_course(dir.path());

    let out = ok(
        dir.path(),
        &["submit", "--student", "alice", "--module", "safety", "--score", "42"],
    );
    assert!(out.contains("Attempt:  1 of 3"), "got: {out}");
    assert!(out.contains("FAILED"));

    let out = ok(
        dir.path(),
        &["submit", "--student", "alice", "--module", "safety", "--score", "64.5"],
    );
    assert!(out.contains("Attempt:  2 of 3"), "got: {out}");
    assert!(out.contains("PASSED"));
}

#[test]
fn cli_submit_rejects_out_of_range_score() {
    let dir = tempfile::tempdir().unwrap();
    author_course(dir.path());

    let output = cprog(
        dir.path(),
        &["submit", "--student", "alice", "--module", "safety", "--score", "101"],
    );
    assert!(!output.status.success());
    assert!(stderr(&output).contains("score must be 0-100"));
}

#[test]
fn cli_lock_request_grant_flow() {
    let dir = tempfile::tempdir().unwrap();
    author_course(dir.path());
    let submit = ["submit", "--student", "bob", "--module", "safety", "--score", "10"];

    for _ in 0..3 {
        ok(dir.path(), &submit);
    }

    // Fourth attempt is refused with a hint.
    let output = cprog(dir.path(), &submit);
    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("error:"), "got: {err}");
    assert!(err.contains("hint:"), "got: {err}");

    let out = ok(
        dir.path(),
        &["can-attempt", "--student", "bob", "--module", "safety"],
    );
    assert!(out.contains("LOCKED"), "got: {out}");

    let out = ok(
        dir.path(),
        &["locked", "--student", "bob", "--course", "carpentry"],
    );
    assert!(out.contains("safety"), "got: {out}");

    let out = ok(
        dir.path(),
        &["request", "--student", "bob", "--module", "safety"],
    );
    assert!(out.contains("Re-evaluation requested"));
    assert!(out.contains("re-sit fee applies"), "got: {out}");

    let out = ok(dir.path(), &["requests", "--course", "carpentry"]);
    assert!(out.contains("bob"), "got: {out}");

    let out = ok(
        dir.path(),
        &["grant", "--student", "bob", "--module", "safety"],
    );
    assert!(out.contains("Re-evaluation granted"), "got: {out}");

    let out = ok(dir.path(), &["requests", "--course", "carpentry"]);
    assert!(out.contains("No pending"), "got: {out}");

    let out = ok(dir.path(), &submit);
    assert!(out.contains("Attempt:  1 of 3"), "got: {out}");
}

#[test]
fn cli_grant_on_open_module_is_noop() {
    let dir = tempfile::tempdir().unwrap();
    author_course(dir.path());
    ok(
        dir.path(),
        &["submit", "--student", "carol", "--module", "safety", "--score", "20"],
    );

    let out = ok(
        dir.path(),
        &["grant", "--student", "carol", "--module", "safety"],
    );
    assert!(out.contains("Nothing to grant"), "got: {out}");
}

#[test]
fn cli_transcript_and_certificate() {
    let dir = tempfile::tempdir().unwrap();
    author_course(dir.path());

    let out = ok(
        dir.path(),
        &["finished", "--student", "dana", "--course", "carpentry"],
    );
    assert!(out.contains("has not finished"), "got: {out}");

    ok(
        dir.path(),
        &["submit", "--student", "dana", "--module", "safety", "--score", "90"],
    );
    ok(
        dir.path(),
        &["submit", "--student", "dana", "--module", "exam", "--score", "80"],
    );

    let out = ok(
        dir.path(),
        &["transcript", "--student", "dana", "--course", "carpentry"],
    );
    assert!(out.contains("Transcript: dana / carpentry"), "got: {out}");
    assert!(out.contains("COMPETENT"));
    assert!(out.contains("85.0"));
    assert!(out.contains("EXCELLENT"));

    let out = ok(
        dir.path(),
        &["finished", "--student", "dana", "--course", "carpentry"],
    );
    assert!(out.contains("has finished"), "got: {out}");
}

#[test]
fn cli_json_output_is_parseable() {
    let dir = tempfile::tempdir().unwrap();
    author_course(dir.path());

    let out = ok(
        dir.path(),
        &[
            "--json", "submit", "--student", "erin", "--module", "safety", "--score", "55",
        ],
    );
    let record: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(record["attempts"], 1);
    assert_eq!(record["passed"], true);

    let out = ok(
        dir.path(),
        &["--json", "standing", "--student", "erin", "--course", "carpentry"],
    );
    let standing: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(standing["average_score"], 55.0);
    assert_eq!(standing["fee_required"], true);

    let out = ok(
        dir.path(),
        &["--json", "can-attempt", "--student", "erin", "--module", "safety"],
    );
    let decision: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(decision["allowed"], true);
    assert_eq!(decision["attempts_remaining"], 2);
}

#[test]
fn cli_policy_file_overrides_attempt_limit() {
    let dir = tempfile::tempdir().unwrap();
    author_course(dir.path());
    let policy = dir.path().join("policy.json");
    std::fs::write(&policy, r#"{"max_attempts": 1}"#).unwrap();
    let policy = policy.to_str().unwrap();

    ok(
        dir.path(),
        &[
            "--config", policy, "submit", "--student", "finn", "--module", "safety", "--score",
            "5",
        ],
    );
    let output = cprog(
        dir.path(),
        &[
            "--config", policy, "submit", "--student", "finn", "--module", "safety", "--score",
            "5",
        ],
    );
    assert!(!output.status.success());
}

#[test]
fn cli_malformed_policy_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let policy = dir.path().join("policy.json");
    std::fs::write(&policy, "not json").unwrap();

    let output = cprog(
        dir.path(),
        &[
            "--config",
            policy.to_str().unwrap(),
            "module",
            "list",
            "--course",
            "c1",
        ],
    );
    assert!(!output.status.success());
    assert!(stderr(&output).contains("failed to load policy"));
}
