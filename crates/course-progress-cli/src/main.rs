//! course-progress CLI — `cprog` command.
//!
//! Provides a command-line interface over the course progression engine:
//! authoring modules, recording quiz submissions, handling re-evaluation
//! requests and grants, and printing transcripts.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use course_progress::authorization::check_access;
use course_progress::time::micros_to_rfc3339;
use course_progress::{
    build_transcript, compute_standing, grant_access, is_course_finished, list_locked_modules,
    list_pending_requests, request_reevaluation, submit_attempt, CourseId, ErrorClass, FileStore,
    GrantOutcome, Module, ModuleId, PolicyConfig, ProgressError, RecordStore, StudentId,
};

// ── Directory helpers ─────────────────────────────────────────────────────────

fn default_store_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME not set; pass --store")?;
    Ok(PathBuf::from(home).join(".course-progress"))
}

// ── Time formatting helpers ───────────────────────────────────────────────────

fn micros_to_datetime(micros: u64) -> String {
    let secs = (micros / 1_000_000) as i64;
    chrono::DateTime::from_timestamp(secs, 0)
        .unwrap_or(chrono::DateTime::UNIX_EPOCH)
        .format("%Y-%m-%d %H:%M:%S UTC")
        .to_string()
}

// ── CLI structure ─────────────────────────────────────────────────────────────

/// course-progress CLI — record quiz attempts, manage module locks and
/// re-evaluations, and print transcripts.
#[derive(Parser, Debug)]
#[command(
    name = "cprog",
    about = "course-progress CLI",
    version,
    long_about = "cprog — course-progress CLI\n\nRecord quiz attempts, check module locks, grant re-evaluations,\nand print transcripts and certificate eligibility."
)]
struct Cli {
    /// Store directory (default: ~/.course-progress)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Policy file (JSON) overriding max attempts, fee threshold, retries
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage course modules
    Module {
        #[command(subcommand)]
        subcommand: ModuleCommands,
    },

    /// Record a quiz submission
    Submit {
        #[arg(long)]
        student: String,
        #[arg(long)]
        module: String,
        /// Raw score, 0-100
        #[arg(long)]
        score: f64,
    },

    /// Check whether a student may attempt a module quiz now
    CanAttempt {
        #[arg(long)]
        student: String,
        #[arg(long)]
        module: String,
    },

    /// Show running average and fee-waiver eligibility
    Standing {
        #[arg(long)]
        student: String,
        #[arg(long)]
        course: String,
    },

    /// List modules the student has locked
    Locked {
        #[arg(long)]
        student: String,
        #[arg(long)]
        course: String,
    },

    /// Grant re-evaluation access to a locked module (admin)
    Grant {
        #[arg(long)]
        student: String,
        #[arg(long)]
        module: String,
    },

    /// Request re-evaluation of a locked module (student)
    Request {
        #[arg(long)]
        student: String,
        #[arg(long)]
        module: String,
    },

    /// List pending re-evaluation requests in a course (admin)
    Requests {
        #[arg(long)]
        course: String,
    },

    /// Print a student's transcript
    Transcript {
        #[arg(long)]
        student: String,
        #[arg(long)]
        course: String,
    },

    /// Check certificate eligibility
    Finished {
        #[arg(long)]
        student: String,
        #[arg(long)]
        course: String,
    },
}

#[derive(Subcommand, Debug)]
enum ModuleCommands {
    /// Create or replace a module
    Add {
        #[arg(long)]
        id: String,
        #[arg(long)]
        course: String,
        #[arg(long)]
        title: String,
        /// Position in the course
        #[arg(long)]
        order: u32,
        /// Minimum passing score, 0-100
        #[arg(long)]
        pass_mark: u8,
        /// Mark as the course's final assessment
        #[arg(long = "final")]
        final_assessment: bool,
    },
    /// List the modules of a course
    List {
        #[arg(long)]
        course: String,
    },
}

/// Execution context shared by all commands.
struct Ctx {
    store: FileStore,
    policy: PolicyConfig,
    json: bool,
    verbose: bool,
}

impl Ctx {
    fn open(store: Option<&Path>, config: Option<&Path>, json: bool, verbose: bool) -> Result<Self> {
        let dir = match store {
            Some(dir) => dir.to_path_buf(),
            None => default_store_dir()?,
        };
        let store = FileStore::new(&dir)
            .with_context(|| format!("failed to open store at {}", dir.display()))?;
        let policy = match config {
            Some(path) => PolicyConfig::from_json_file(path)
                .with_context(|| format!("failed to load policy {}", path.display()))?,
            None => PolicyConfig::default(),
        };
        log::debug!("store {} policy {:?}", dir.display(), policy);
        Ok(Self {
            store,
            policy,
            json,
            verbose,
        })
    }

    fn print_json<T: Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

// ── Main entry point ──────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let result = Ctx::open(
        cli.store.as_deref(),
        cli.config.as_deref(),
        cli.json,
        cli.verbose,
    )
    .and_then(|ctx| run(&ctx, cli.command));

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        if let Some(hint) = e.downcast_ref::<ProgressError>().and_then(hint_for) {
            eprintln!("hint: {hint}");
        }
        std::process::exit(1);
    }
}

fn run(ctx: &Ctx, command: Commands) -> Result<()> {
    match command {
        Commands::Module { subcommand } => match subcommand {
            ModuleCommands::Add {
                id,
                course,
                title,
                order,
                pass_mark,
                final_assessment,
            } => cmd_module_add(ctx, id, course, title, order, pass_mark, final_assessment),
            ModuleCommands::List { course } => cmd_module_list(ctx, &course),
        },
        Commands::Submit {
            student,
            module,
            score,
        } => cmd_submit(ctx, &student, &module, score),
        Commands::CanAttempt { student, module } => cmd_can_attempt(ctx, &student, &module),
        Commands::Standing { student, course } => cmd_standing(ctx, &student, &course),
        Commands::Locked { student, course } => cmd_locked(ctx, &student, &course),
        Commands::Grant { student, module } => cmd_grant(ctx, &student, &module),
        Commands::Request { student, module } => cmd_request(ctx, &student, &module),
        Commands::Requests { course } => cmd_requests(ctx, &course),
        Commands::Transcript { student, course } => cmd_transcript(ctx, &student, &course),
        Commands::Finished { student, course } => cmd_finished(ctx, &student, &course),
    }
}

/// Follow-up advice for the error classes a user can act on.
fn hint_for(err: &ProgressError) -> Option<&'static str> {
    match err.class() {
        ErrorClass::Authorization => {
            Some("module is locked; request a re-evaluation with `cprog request`")
        }
        ErrorClass::Concurrency => Some("another update raced this one; retry the command"),
        ErrorClass::Validation | ErrorClass::Persistence => None,
    }
}

// ── Command implementations ───────────────────────────────────────────────────

/// `cprog module add --id ID --course C --title T --order N --pass-mark P [--final]`
fn cmd_module_add(
    ctx: &Ctx,
    id: String,
    course: String,
    title: String,
    order: u32,
    pass_mark: u8,
    final_assessment: bool,
) -> Result<()> {
    let mut module = Module::new(id, course, title, order, pass_mark);
    if let Some(existing) = ctx.store.get_module(&module.id)? {
        // Re-authoring keeps granted re-evaluations.
        module.allow_list = existing.allow_list;
    }
    if final_assessment {
        module = module.final_assessment();
    }
    ctx.store.put_module(&module)?;

    if ctx.json {
        return ctx.print_json(&module);
    }
    println!("Saved module '{}'", module.id);
    println!("  Course:    {}", module.course_id);
    println!("  Title:     {}", module.title);
    println!("  Order:     {}", module.order);
    println!("  Pass mark: {}", module.pass_mark);
    if module.is_final_assessment {
        println!("  Final assessment");
    }
    Ok(())
}

/// `cprog module list --course C`
fn cmd_module_list(ctx: &Ctx, course: &str) -> Result<()> {
    let modules = ctx.store.list_modules(&CourseId::new(course))?;
    if ctx.json {
        return ctx.print_json(&modules);
    }
    if modules.is_empty() {
        println!("No modules in course '{course}'.");
        return Ok(());
    }
    println!("Modules in '{course}':");
    for m in &modules {
        let tag = if m.is_final_assessment { " [final]" } else { "" };
        println!(
            "  {:>3}. {:<20} pass {:>3}  {}{tag}",
            m.order, m.id, m.pass_mark, m.title
        );
        if ctx.verbose && !m.allow_list.is_empty() {
            let names: Vec<&str> = m.allow_list.iter().map(|s| s.as_str()).collect();
            println!("       allow-list: {}", names.join(", "));
        }
    }
    Ok(())
}

/// `cprog submit --student S --module M --score X`
fn cmd_submit(ctx: &Ctx, student: &str, module: &str, score: f64) -> Result<()> {
    let record = submit_attempt(
        &ctx.store,
        &ctx.policy,
        &StudentId::new(student),
        &ModuleId::new(module),
        score,
    )?;

    if ctx.json {
        return ctx.print_json(&record);
    }
    println!("Submission recorded");
    println!("  Student:  {}", record.student_id);
    println!("  Module:   {}", record.module_id);
    println!("  Score:    {:.1}", record.score);
    println!(
        "  Attempt:  {} of {}",
        record.attempts, ctx.policy.max_attempts
    );
    println!("  Result:   {}", if record.passed { "PASSED" } else { "FAILED" });
    if ctx.verbose {
        println!("  Updated:  {}", micros_to_datetime(record.updated_at));
    }
    Ok(())
}

/// `cprog can-attempt --student S --module M`
fn cmd_can_attempt(ctx: &Ctx, student: &str, module: &str) -> Result<()> {
    let decision = check_access(
        &ctx.store,
        &ctx.policy,
        &StudentId::new(student),
        &ModuleId::new(module),
    )?;

    if ctx.json {
        return ctx.print_json(&decision);
    }
    println!(
        "{}: {}",
        module,
        if decision.allowed { "ALLOWED" } else { "LOCKED" }
    );
    println!(
        "  Attempts used: {} (remaining {})",
        decision.attempts_used, decision.attempts_remaining
    );
    if decision.locked && decision.allowed {
        if decision.on_allow_list {
            println!("  Re-authorized via allow-list");
        }
        if decision.record_authorized {
            println!("  Re-authorized on record");
        }
    }
    Ok(())
}

/// `cprog standing --student S --course C`
fn cmd_standing(ctx: &Ctx, student: &str, course: &str) -> Result<()> {
    let standing = compute_standing(
        &ctx.store,
        &ctx.policy,
        &StudentId::new(student),
        &CourseId::new(course),
    )?;

    if ctx.json {
        return ctx.print_json(&standing);
    }
    println!("Standing for '{}' in '{}':", student, course);
    println!(
        "  Average: {:.2} over {} module(s)",
        standing.average_score, standing.modules_counted
    );
    println!(
        "  Re-sit fee: {} (threshold {:.0})",
        if standing.fee_required { "required" } else { "waived" },
        ctx.policy.fee_threshold_percent
    );
    Ok(())
}

/// `cprog locked --student S --course C`
fn cmd_locked(ctx: &Ctx, student: &str, course: &str) -> Result<()> {
    let locked = list_locked_modules(
        &ctx.store,
        &ctx.policy,
        &StudentId::new(student),
        &CourseId::new(course),
    )?;

    if ctx.json {
        return ctx.print_json(&locked);
    }
    if locked.is_empty() {
        println!("No locked modules for '{student}'.");
        return Ok(());
    }
    println!("Locked modules for '{student}':");
    for m in &locked {
        println!("  {}: {}", m.id, m.title);
    }
    Ok(())
}

/// `cprog grant --student S --module M`
fn cmd_grant(ctx: &Ctx, student: &str, module: &str) -> Result<()> {
    let outcome = grant_access(
        &ctx.store,
        &ctx.policy,
        &StudentId::new(student),
        &ModuleId::new(module),
    )?;

    let granted = outcome.is_granted();
    if ctx.json {
        return ctx.print_json(&serde_json::json!({
            "student": student,
            "module": module,
            "granted": granted,
        }));
    }
    match outcome {
        GrantOutcome::Granted { .. } => {
            println!("Re-evaluation granted: '{student}' may attempt '{module}' again")
        }
        GrantOutcome::NotLocked => {
            println!("Nothing to grant: '{module}' is not locked for '{student}'")
        }
    }
    Ok(())
}

/// `cprog request --student S --module M`
fn cmd_request(ctx: &Ctx, student: &str, module: &str) -> Result<()> {
    let record = request_reevaluation(
        &ctx.store,
        &ctx.policy,
        &StudentId::new(student),
        &ModuleId::new(module),
    )?;

    if ctx.json {
        return ctx.print_json(&record);
    }
    println!("Re-evaluation requested for '{module}'");
    let standing = compute_standing(
        &ctx.store,
        &ctx.policy,
        &record.student_id,
        &module_course(ctx, &record.module_id)?,
    )?;
    if standing.fee_required {
        println!(
            "  A re-sit fee applies (average {:.2} below {:.0})",
            standing.average_score, ctx.policy.fee_threshold_percent
        );
    } else {
        println!("  Re-sit fee waived (average {:.2})", standing.average_score);
    }
    Ok(())
}

fn module_course(ctx: &Ctx, module: &ModuleId) -> Result<CourseId> {
    ctx.store
        .get_module(module)?
        .map(|m| m.course_id)
        .ok_or_else(|| anyhow!("module '{}' disappeared", module))
}

#[derive(Serialize)]
struct PendingRequest<'a> {
    student: &'a str,
    module: &'a str,
    attempts: u32,
    requested_at: String,
}

/// `cprog requests --course C`
fn cmd_requests(ctx: &Ctx, course: &str) -> Result<()> {
    let pending = list_pending_requests(&ctx.store, &ctx.policy, &CourseId::new(course))?;
    let rows: Vec<PendingRequest<'_>> = pending
        .iter()
        .map(|r| PendingRequest {
            student: r.student_id.as_str(),
            module: r.module_id.as_str(),
            attempts: r.attempts,
            requested_at: micros_to_rfc3339(r.updated_at),
        })
        .collect();

    if ctx.json {
        return ctx.print_json(&rows);
    }
    if pending.is_empty() {
        println!("No pending re-evaluation requests in '{course}'.");
        return Ok(());
    }
    println!("Pending re-evaluation requests in '{course}':");
    for r in &pending {
        println!(
            "  {:<16} {:<16} attempts {}  since {}",
            r.student_id.as_str(),
            r.module_id.as_str(),
            r.attempts,
            micros_to_datetime(r.updated_at)
        );
    }
    Ok(())
}

/// `cprog transcript --student S --course C`
fn cmd_transcript(ctx: &Ctx, student: &str, course: &str) -> Result<()> {
    let transcript = build_transcript(&ctx.store, &StudentId::new(student), &CourseId::new(course))?;
    if ctx.json {
        return ctx.print_json(&transcript);
    }
    println!("{transcript}");
    Ok(())
}

/// `cprog finished --student S --course C`
fn cmd_finished(ctx: &Ctx, student: &str, course: &str) -> Result<()> {
    let finished = is_course_finished(&ctx.store, &StudentId::new(student), &CourseId::new(course))?;
    if ctx.json {
        return ctx.print_json(&serde_json::json!({
            "student": student,
            "course": course,
            "finished": finished,
        }));
    }
    if finished {
        println!("'{student}' has finished '{course}' (certificate available)");
    } else {
        println!("'{student}' has not finished '{course}'");
    }
    Ok(())
}
