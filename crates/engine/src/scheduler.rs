// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `JobHandler` control loop: enumerates jobs, applies readiness/retry/cap
//! policies, drains listeners, flushes snapshots (spec.md §4.5).

use crate::error::{EngineError, EngineResult};
use crate::listener::Listener;
use crate::options::Options;
use crate::resolver::is_ready;
use jg_core::{
    Backend, Clock, Job, JobConfig, JobContainer, JobHandlerConfig, Mode, Predicate, Status, SystemClock, Type,
};
use jg_storage::SnapshotStore;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Shutdown has not been requested; the loop submits and runs jobs
/// normally.
pub const RUNNING: u8 = 0;
/// First SIGINT: stop submitting new jobs, let LOCAL children finish on
/// their own.
pub const STOP_SUBMITTING: u8 = 1;
/// Second SIGINT: cancel LOCAL children outright.
pub const CANCEL_LOCAL: u8 = 2;

/// A cheap, clonable handle a signal handler (or a test) can use to step
/// through the two-stage graceful shutdown described in spec.md §4.5.
/// Registering an actual OS signal handler is a CLI-boundary concern; the
/// scheduler only consults the level this handle carries.
#[derive(Clone, Default)]
pub struct ShutdownHandle(Arc<AtomicU8>);

impl ShutdownHandle {
    pub fn level(&self) -> u8 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn request_stop_submitting(&self) {
        self.0.fetch_max(STOP_SUBMITTING, Ordering::SeqCst);
    }

    pub fn request_cancel_local(&self) {
        self.0.fetch_max(CANCEL_LOCAL, Ordering::SeqCst);
    }
}

/// Attributes substituted for `@SLURMY.<key>` tokens in a job's script.
fn script_attrs(config: &JobConfig) -> HashMap<String, String> {
    let mut attrs = HashMap::new();
    attrs.insert("name".to_string(), config.name.clone());
    attrs.insert("max_retries".to_string(), config.max_retries.to_string());
    if let Some(output) = &config.output {
        attrs.insert("output".to_string(), output.display().to_string());
    }
    attrs
}

pub struct Scheduler<C: Clock = SystemClock> {
    container: JobContainer,
    session: JobHandlerConfig,
    store: SnapshotStore,
    options: Options,
    listeners: Vec<Listener>,
    clock: C,
    shutdown: ShutdownHandle,
}

impl Scheduler<SystemClock> {
    pub fn new(session: JobHandlerConfig, options: Options) -> EngineResult<Self> {
        Self::with_clock(session, options, SystemClock)
    }

    /// Reconstruct a session from its snapshot directory (spec.md §4.7
    /// Reload). See [`Scheduler::reload_with_clock`].
    pub fn reload(
        work_dir: impl Into<PathBuf>,
        session_name: &str,
        options: Options,
        backend_for_kind: impl Fn(&str) -> Arc<dyn Backend>,
    ) -> EngineResult<Self> {
        Self::reload_with_clock(work_dir, session_name, options, SystemClock, backend_for_kind)
    }
}

impl<C: Clock> Scheduler<C> {
    pub fn with_clock(session: JobHandlerConfig, options: Options, clock: C) -> EngineResult<Self> {
        let store = SnapshotStore::new(session.snapshot_dir());
        Ok(Self {
            container: JobContainer::new(),
            session,
            store,
            options,
            listeners: Vec::new(),
            clock,
            shutdown: ShutdownHandle::default(),
        })
    }

    /// Reconstruct a session from its snapshot directory given an explicit
    /// clock (for deterministic tests).
    ///
    /// Reads the session config, then every tracked job-config path in
    /// declaration order, re-attaching a live [`Backend`] via
    /// `backend_for_kind` keyed on each job's persisted `backend_kind`.
    /// Predicates (`finished_func`/`success_func`/`post_func`) do not cross
    /// the serialisation boundary (spec.md §9 "Snapshot cyclic
    /// references") — a caller relying on custom ones must re-attach them
    /// on the returned container's jobs before resuming the loop.
    ///
    /// A LOCAL job whose persisted status was RUNNING is resurrected as
    /// CANCELLED rather than RUNNING: its child process could not have
    /// survived the restart, and resurrecting it as RUNNING would leave it
    /// wedged forever once nothing is left to poll an exit code from
    /// (spec.md §9 "stale local queue" — the open question this
    /// implementation resolves, see DESIGN.md).
    pub fn reload_with_clock(
        work_dir: impl Into<PathBuf>,
        session_name: &str,
        options: Options,
        clock: C,
        backend_for_kind: impl Fn(&str) -> Arc<dyn Backend>,
    ) -> EngineResult<Self> {
        let snapshot_dir = work_dir.into().join(session_name).join("snapshot");
        let store = SnapshotStore::new(snapshot_dir);
        let mut session = store.read_session()?;

        let mut container = JobContainer::new();
        for path in session.job_config_paths.clone() {
            let name = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .ok_or_else(|| jg_core::CoreError::UnknownJob(path.display().to_string()))?
                .to_string();
            let mut config = store.read_job(&name)?;
            config.backend = Some(backend_for_kind(&config.backend_kind));
            if config.job_type == Type::Local && config.status == Status::Running {
                tracing::warn!(job = %config.name, "resurrecting stale RUNNING local job as CANCELLED on reload");
                config.status = Status::Cancelled;
                config.job_id = None;
                config.dirty = true;
            }
            container.add(Job::new(config))?;
        }
        session.dirty = false;

        Ok(Self { container, session, store, options, listeners: Vec::new(), clock, shutdown: ShutdownHandle::default() })
    }

    pub fn container(&self) -> &JobContainer {
        &self.container
    }

    pub fn session(&self) -> &JobHandlerConfig {
        &self.session
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    pub fn register_listener(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    /// Materialise the run-script (parser substitution, marker rewrite,
    /// executable bits via the backend), synthesise any marker-derived
    /// predicate, and insert the job into the container.
    ///
    /// Mirrors the `user -> Scheduler.add_job -> Parser -> Backend.write_script
    /// -> Job inserted in Container` flow.
    pub fn add_job(&mut self, mut config: JobConfig) -> EngineResult<()> {
        let backend = config
            .backend
            .clone()
            .ok_or_else(|| jg_core::CoreError::NotConfigured(config.name.clone()))?;

        std::fs::create_dir_all(self.session.scripts_dir())?;
        std::fs::create_dir_all(self.session.tmp_dir())?;
        let script_path = backend.write_script(&config, &self.session.scripts_dir())?;

        let raw = std::fs::read_to_string(&script_path)?;
        let attrs = script_attrs(&config);
        let (substituted, warnings) = jg_parser::replace(&raw, &attrs);
        for warning in &warnings {
            tracing::warn!(job = %config.name, token = %warning, "unresolved script token");
        }

        let rewrite =
            jg_parser::rewrite_markers(&substituted, &config.name, &self.session.tmp_dir(), config.output.is_some());
        for warning in &rewrite.warnings {
            tracing::warn!(job = %config.name, "{warning}");
        }
        std::fs::write(&script_path, &rewrite.text)?;
        config.script = script_path;

        if let Some(marker_path) = rewrite.finished_marker {
            if config.finished_func.is_none() {
                config.finished_func = Some(Predicate::output_file(marker_path, self.session.output_max_attempts));
            }
        }
        let mut finished_passive = false;
        if let Some(marker_path) = rewrite.success_marker {
            if config.success_func.is_none() {
                config.success_func = Some(Predicate::output_file(marker_path, self.session.output_max_attempts));
                finished_passive = true;
            }
        } else if config.success_func.is_none() {
            if let Some(path) = config.output.clone() {
                config.success_func = Some(Predicate::output_file(path, self.session.output_max_attempts));
                finished_passive = true;
            }
        }

        if self.session.listens {
            config.set_mode(Status::Running, Mode::Passive);
        }

        let snapshot_path = self.session.snapshot_dir().join(format!("{}.json", config.name));
        self.session.track_job_path(snapshot_path);

        let mut job = Job::new(config);
        if finished_passive {
            job.set_mode(Status::Finished, Mode::Passive);
        }
        self.container.add(job)?;
        Ok(())
    }

    /// One submission pass over every job in declaration order (spec.md
    /// §4.5 step 2). `ignore_max_retries` mirrors `run_jobs(retry=true)`'s
    /// initialisation of a bounded one-shot retry for FAILED/CANCELLED jobs.
    pub fn submit_jobs(&mut self, ignore_max_retries: bool) -> EngineResult<()> {
        let names: Vec<String> = self.container.names_in_order().map(str::to_string).collect();
        let now_ms = self.clock.epoch_ms();

        for name in names {
            let status = self.container.job(&name)?.status();

            if let Some(run_max) = self.session.run_max {
                if self.container.count_in_status(Status::Running) >= run_max as usize {
                    continue;
                }
            }

            if matches!(status, Status::Failed | Status::Cancelled) {
                self.container.job_mut(&name)?.retry(false, true, ignore_max_retries, None)?;
                self.container.reindex(&name)?;
                continue;
            }

            if status != Status::Configured {
                continue;
            }

            if !is_ready(&mut self.container, &name, now_ms, self.session.local_max)? {
                self.container.reindex(&name)?;
                continue;
            }

            if self.session.local_dynamic
                && self.container.local_count() < self.session.local_max as usize
            {
                self.container.job_mut(&name)?.set_type(Type::Local)?;
                self.container.update_tags(&name)?;
            }

            let id = {
                let job = self.container.job_mut(&name)?;
                job.submit()?;
                job.job_id().map(str::to_string)
            };
            if let Some(id) = id {
                self.container.add_id(id, &name)?;
            }
            self.container.reindex(&name)?;
        }
        Ok(())
    }

    /// Refresh every non-terminal job's own self-evaluated status (the
    /// ACTIVE half of `get_status`; PASSIVE jobs wait on listener drains).
    pub fn refresh_jobs(&mut self) -> EngineResult<()> {
        let names: Vec<String> = self.container.names_in_order().map(str::to_string).collect();
        for name in names {
            self.container.job_mut(&name)?.get_status(false, false)?;
            self.container.reindex(&name)?;
        }
        Ok(())
    }

    /// Drain every registered listener's latest payload into the
    /// container. Must run before `submit_jobs` within a tick (spec.md §5
    /// ordering guarantee).
    pub fn drain_listeners(&mut self) -> EngineResult<()> {
        for listener in &mut self.listeners {
            listener.drain(&mut self.container)?;
        }
        Ok(())
    }

    /// One full control-loop tick: drain listeners, refresh active jobs,
    /// then attempt submissions (unless shutdown has reached
    /// `STOP_SUBMITTING`).
    pub fn tick(&mut self, ignore_max_retries: bool) -> EngineResult<()> {
        self.drain_listeners()?;
        self.refresh_jobs()?;
        if self.shutdown.level() == RUNNING {
            self.submit_jobs(ignore_max_retries)?;
        }
        if self.shutdown.level() >= CANCEL_LOCAL {
            self.cancel_local_children()?;
        }
        self.flush_snapshot()?;
        Ok(())
    }

    /// True once every job has reached a terminal status (the loop's exit
    /// condition).
    pub fn is_done(&self) -> bool {
        self.container.all_terminal()
    }

    /// Cancel every RUNNING job matching `tags` (all jobs if `None`).
    /// Synchronous: blocks on each cancel in turn (spec.md §5).
    pub fn cancel_jobs(&mut self, tags: Option<&std::collections::HashSet<String>>) -> EngineResult<()> {
        let running = std::collections::HashSet::from([Status::Running]);
        let names: Vec<String> = self
            .container
            .get(tags, Some(&running))
            .into_iter()
            .map(|job| job.name().to_string())
            .collect();
        for name in names {
            self.container.job_mut(&name)?.cancel(false)?;
            self.container.reindex(&name)?;
        }
        Ok(())
    }

    fn cancel_local_children(&mut self) -> EngineResult<()> {
        let running = std::collections::HashSet::from([Status::Running]);
        let names: Vec<String> = self
            .container
            .get(None, Some(&running))
            .into_iter()
            .filter(|job| job.is_local())
            .map(|job| job.name().to_string())
            .collect();
        for name in names {
            self.container.job_mut(&name)?.cancel(false)?;
            self.container.reindex(&name)?;
        }
        Ok(())
    }

    /// Unrecoverable-error path (spec.md §4.5): cancel every RUNNING job
    /// before propagating `cause`.
    pub fn cancel_all_running_and_propagate(&mut self, cause: EngineError) -> EngineError {
        if let Err(e) = self.cancel_jobs(None) {
            tracing::error!(error = %e, "failed to cancel running jobs during abort");
        }
        cause
    }

    /// Write every dirty job config and the session config, clearing their
    /// dirty flags on success.
    pub fn flush_snapshot(&mut self) -> EngineResult<()> {
        if !self.session.do_snapshot {
            return Ok(());
        }
        for name in self.container.names_in_order().map(str::to_string).collect::<Vec<_>>() {
            let job = self.container.job_mut(&name)?;
            self.store.write_job_if_dirty(&mut job.config)?;
        }
        self.store.write_session_if_dirty(&mut self.session)?;
        Ok(())
    }

    pub fn stop_listeners(&mut self) {
        for listener in self.listeners.drain(..) {
            listener.stop();
        }
    }

    /// Top-level control loop (spec.md §4.5 `run_jobs(interval, retry)`).
    ///
    /// If `retry` is set, every job already in {FAILED, CANCELLED} when the
    /// loop starts is given exactly one additional attempt: its
    /// `max_retries` is temporarily forced to 1 (`n_retries` to 0) for the
    /// loop's duration and restored to its original value at exit,
    /// regardless of how the loop ends. `on_tick` is called once before the
    /// first tick and again after every tick and once more at loop exit —
    /// the seam a caller hangs a printer off, without this crate depending
    /// on `jg-printer` itself.
    ///
    /// Terminates once every job is terminal, or once shutdown has reached
    /// [`STOP_SUBMITTING`] and no LOCAL job is still occupying a slot
    /// (spec.md §4.5 "Exceptional control flow" — waiting for LOCAL
    /// children to finish on the first Ctrl-C tier). On any tick error, every
    /// RUNNING job is cancelled before the error propagates (spec.md §7
    /// propagation policy); listeners are always stopped and the snapshot
    /// always flushed on the way out.
    pub fn run_jobs(
        &mut self,
        interval: Duration,
        retry: bool,
        mut on_tick: impl FnMut(&JobContainer),
    ) -> EngineResult<()> {
        let mut restore_max_retries: Vec<(String, u32)> = Vec::new();
        if retry {
            let names: Vec<String> = self.container.names_in_order().map(str::to_string).collect();
            for name in names {
                let job = self.container.job_mut(&name)?;
                if matches!(job.status(), Status::Failed | Status::Cancelled) {
                    restore_max_retries.push((name, job.config.max_retries));
                    job.config.max_retries = 1;
                    job.config.n_retries = 0;
                    job.config.dirty = true;
                }
            }
        }

        on_tick(&self.container);
        let outcome = self.run_loop(interval, &mut on_tick);

        for (name, original) in restore_max_retries {
            if let Ok(job) = self.container.job_mut(&name) {
                job.config.max_retries = original;
                job.config.dirty = true;
            }
        }

        match outcome {
            Ok(()) => {
                self.stop_listeners();
                self.flush_snapshot()?;
                on_tick(&self.container);
                Ok(())
            }
            Err(e) => {
                let e = self.cancel_all_running_and_propagate(e);
                self.stop_listeners();
                let _ = self.flush_snapshot();
                Err(e)
            }
        }
    }

    fn run_loop(&mut self, interval: Duration, on_tick: &mut impl FnMut(&JobContainer)) -> EngineResult<()> {
        loop {
            self.tick(false)?;
            on_tick(&self.container);
            if self.is_done() {
                return Ok(());
            }
            if self.shutdown.level() >= STOP_SUBMITTING && self.container.local_count() == 0 {
                return Ok(());
            }
            std::thread::sleep(interval);
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
