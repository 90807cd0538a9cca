// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `jg`: a thin binary that wires the crates together for a single session
//! run against the in-memory `TestBackend` — concrete scheduler adapters,
//! config-file parsing, and name generation are front-end concerns
//! explicitly out of scope for the core (spec.md §1). Jobs are described
//! directly on the command line.

mod exit_error;

use std::collections::HashMap;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use jg_backend::TestBackend;
use jg_core::{Backend, JobConfig, JobHandlerConfig};
use jg_engine::{Options, Scheduler};
use jg_printer::{BarPrinter, PlainPrinter, Printer};

use exit_error::ExitError;

#[derive(Parser)]
#[command(name = "jg", version, about = "Batch-job orchestration core")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit a fresh session and drive it to completion.
    Run(RunArgs),
    /// Resume a session from its last snapshot (spec.md §4.7 Reload).
    Reload(ReloadArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Session name; also the scripts/logs/snapshot subdirectory under work-dir.
    #[arg(long)]
    name: String,

    /// Directory the session's scripts/logs/snapshot directories live under.
    #[arg(long, default_value = ".")]
    work_dir: PathBuf,

    /// A job to submit, `name=script_path`. Repeatable.
    #[arg(long = "job", value_parser = parse_kv, required = true)]
    jobs: Vec<(String, String)>,

    /// Attach a tag to a job, `name=tag`. Repeatable.
    #[arg(long = "tag", value_parser = parse_kv)]
    tags: Vec<(String, String)>,

    /// Make a job depend on every job carrying a tag, `name=parent_tag`. Repeatable.
    #[arg(long = "depends-on", value_parser = parse_kv)]
    depends_on: Vec<(String, String)>,

    /// Per-backend-kind command wrapper prelude, `kind=template`. Repeatable.
    #[arg(long = "wrapper", value_parser = parse_kv)]
    wrappers: Vec<(String, String)>,

    /// Cap on concurrent LOCAL jobs.
    #[arg(long, default_value_t = 4)]
    local_max: u32,

    /// Cap on jobs RUNNING at once (BATCH + LOCAL combined).
    #[arg(long)]
    run_max: Option<u32>,

    /// Retry budget applied to every submitted job.
    #[arg(long, default_value_t = 0)]
    max_retries: u32,

    /// Poll interval between scheduler ticks.
    #[arg(long, default_value_t = 500)]
    interval_ms: u64,

    /// Give every FAILED/CANCELLED job one more attempt before the run starts.
    #[arg(long)]
    retry: bool,

    /// Render a plain line-per-tick summary instead of an interactive bar.
    #[arg(long)]
    plain: bool,
}

#[derive(Args)]
struct ReloadArgs {
    #[arg(long)]
    name: String,
    #[arg(long, default_value = ".")]
    work_dir: PathBuf,
    #[arg(long, default_value_t = 500)]
    interval_ms: u64,
    #[arg(long)]
    retry: bool,
    #[arg(long)]
    plain: bool,
}

fn parse_kv(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected `key=value`, got `{s}`"))
}

fn main() {
    if let Err(err) = run() {
        match err.downcast::<ExitError>() {
            Ok(exit) => {
                eprintln!("{exit}");
                std::process::exit(exit.code);
            }
            Err(err) => {
                eprintln!("error: {err:#}");
                std::process::exit(1);
            }
        }
    }
}

fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match Cli::parse().command {
        Command::Run(args) => run_session(args),
        Command::Reload(args) => reload_session(args),
    }
}

fn group(pairs: Vec<(String, String)>) -> HashMap<String, Vec<String>> {
    let mut grouped: HashMap<String, Vec<String>> = HashMap::new();
    for (name, value) in pairs {
        grouped.entry(name).or_default().push(value);
    }
    grouped
}

fn run_session(args: RunArgs) -> Result<()> {
    let mut options = Options::new(&args.work_dir);
    for (kind, template) in &args.wrappers {
        options = options.with_wrapper(kind.clone(), template.clone());
    }
    // No real scheduler adapter ships in this workspace (spec.md §1); every
    // session this binary drives runs against the in-memory TestBackend.
    options = options.test_mode(true).default_backend("test");

    let mut session = JobHandlerConfig::new(args.name.clone(), &args.work_dir).local_max(args.local_max);
    if let Some(run_max) = args.run_max {
        session = session.run_max(run_max);
    }

    let mut scheduler = Scheduler::new(session, options.clone()).context("constructing scheduler")?;

    let backend: Arc<dyn Backend> = Arc::new(
        options
            .command_wrapper
            .get("test")
            .cloned()
            .map(|template| TestBackend::new().with_wrapper(template))
            .unwrap_or_default(),
    );

    let mut tags = group(args.tags);
    let mut depends_on = group(args.depends_on);
    for (name, script) in &args.jobs {
        let mut builder = JobConfig::builder(
            name.clone(),
            PathBuf::from(script),
            scheduler.session().log_path(name),
            backend.clone(),
        )
        .max_retries(args.max_retries);
        for tag in tags.remove(name).unwrap_or_default() {
            builder = builder.tag(tag);
        }
        for parent_tag in depends_on.remove(name).unwrap_or_default() {
            builder = builder.parent_tag(parent_tag);
        }
        let config = builder.build().with_context(|| format!("job `{name}`"))?;
        scheduler.add_job(config).with_context(|| format!("adding job `{name}`"))?;
    }

    drive(&mut scheduler, Duration::from_millis(args.interval_ms), args.retry, args.plain)
}

fn reload_session(args: ReloadArgs) -> Result<()> {
    let options = Options::new(&args.work_dir).test_mode(true).default_backend("test");
    let mut scheduler = Scheduler::reload(&args.work_dir, &args.name, options, |kind: &str| -> Arc<dyn Backend> {
        if kind != "test" {
            tracing::warn!(backend_kind = kind, "no adapter for this backend kind in this workspace, using TestBackend");
        }
        Arc::new(TestBackend::new())
    })
    .with_context(|| format!("reloading session `{}`", args.name))?;

    drive(&mut scheduler, Duration::from_millis(args.interval_ms), args.retry, args.plain)
}

fn drive<C: jg_core::Clock>(
    scheduler: &mut Scheduler<C>,
    interval: Duration,
    retry: bool,
    plain: bool,
) -> Result<()> {
    let mut printer: Box<dyn Printer> = if plain || !std::io::stdout().is_terminal() {
        Box::new(PlainPrinter::new())
    } else {
        Box::new(BarPrinter::new())
    };

    let result = scheduler.run_jobs(interval, retry, |container| printer.update(container));
    printer.finish(scheduler.container());
    result.context("running session")?;

    let failed = scheduler.container().count_in_status(jg_core::Status::Failed);
    let cancelled = scheduler.container().count_in_status(jg_core::Status::Cancelled);
    if failed > 0 || cancelled > 0 {
        return Err(ExitError::new(1, format!("{failed} job(s) failed, {cancelled} cancelled")).into());
    }
    Ok(())
}
