// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job identifier, persistent config, and per-job state machine.

use crate::backend::Backend;
use crate::error::{CoreError, CoreResult};
use crate::predicate::{PostAction, Predicate};
use crate::status::{Mode, Status, Type};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;

/// Characters a job name must not contain (the name also doubles as the
/// on-disk script/log file stem).
const INVALID_NAME_CHARS: [char; 3] = ['.', '-', '/'];

pub fn validate_name(name: &str) -> CoreResult<()> {
    let invalid = name.is_empty()
        || name.chars().any(|c| INVALID_NAME_CHARS.contains(&c) || c.is_whitespace());
    if invalid {
        return Err(CoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Persistent configuration and live state of one job.
///
/// This is the unit of snapshot storage. `finished_func`, `success_func`,
/// `post_func`, and the live `backend` handle are runtime-only: they hold
/// closures or trait objects that cannot cross a serialisation boundary, so
/// they are skipped on (de)serialisation. A reloaded `JobConfig` must have
/// its predicates and backend re-attached by the session owner before the
/// job resumes — `backend_kind` is carried precisely so the reload step
/// knows which backend to re-link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub name: String,
    pub script: PathBuf,
    pub args: Vec<String>,
    pub log_path: PathBuf,
    pub tags: HashSet<String>,
    pub parent_tags: HashSet<String>,
    pub max_retries: u32,
    pub n_retries: u32,
    pub output: Option<PathBuf>,
    pub job_type: Type,
    modes: Vec<(Status, Mode)>,
    pub status: Status,
    pub job_id: Option<String>,
    pub exitcode: Option<String>,
    pub starttime: Option<u64>,
    pub backend_kind: String,

    #[serde(skip)]
    pub finished_func: Option<Predicate>,
    #[serde(skip)]
    pub success_func: Option<Predicate>,
    #[serde(skip)]
    pub post_func: Option<PostAction>,
    #[serde(skip)]
    pub dirty: bool,
    #[serde(skip)]
    pub backend: Option<Arc<dyn Backend>>,
}

impl JobConfig {
    pub fn builder(
        name: impl Into<String>,
        script: impl Into<PathBuf>,
        log_path: impl Into<PathBuf>,
        backend: Arc<dyn Backend>,
    ) -> JobConfigBuilder {
        JobConfigBuilder {
            name: name.into(),
            script: script.into(),
            log_path: log_path.into(),
            args: Vec::new(),
            tags: HashSet::new(),
            parent_tags: HashSet::new(),
            max_retries: 0,
            output: None,
            job_type: Type::Batch,
            finished_func: None,
            success_func: None,
            post_func: None,
            starttime: None,
            backend,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn has_tags(&self, tags: &HashSet<String>) -> bool {
        !self.tags.is_disjoint(tags)
    }

    pub fn is_local(&self) -> bool {
        self.job_type == Type::Local
    }

    pub fn mode(&self, status: Status) -> Mode {
        self.modes
            .iter()
            .find(|(s, _)| *s == status)
            .map(|(_, m)| *m)
            .unwrap_or_default()
    }

    pub fn set_mode(&mut self, status: Status, mode: Mode) {
        if let Some(entry) = self.modes.iter_mut().find(|(s, _)| *s == status) {
            entry.1 = mode;
        } else {
            self.modes.push((status, mode));
        }
        self.dirty = true;
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}

pub struct JobConfigBuilder {
    name: String,
    script: PathBuf,
    log_path: PathBuf,
    args: Vec<String>,
    tags: HashSet<String>,
    parent_tags: HashSet<String>,
    max_retries: u32,
    output: Option<PathBuf>,
    job_type: Type,
    finished_func: Option<Predicate>,
    success_func: Option<Predicate>,
    post_func: Option<PostAction>,
    starttime: Option<u64>,
    backend: Arc<dyn Backend>,
}

impl JobConfigBuilder {
    crate::setters! {
        set {
            max_retries: u32,
            job_type: Type,
            args: Vec<String>,
        }
        option {
            output: PathBuf,
            starttime: u64,
        }
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn parent_tag(mut self, tag: impl Into<String>) -> Self {
        self.parent_tags.insert(tag.into());
        self
    }

    pub fn finished_func(mut self, predicate: Predicate) -> Self {
        self.finished_func = Some(predicate);
        self
    }

    pub fn success_func(mut self, predicate: Predicate) -> Self {
        self.success_func = Some(predicate);
        self
    }

    pub fn post_func(mut self, action: PostAction) -> Self {
        self.post_func = Some(action);
        self
    }

    pub fn build(self) -> CoreResult<JobConfig> {
        validate_name(&self.name)?;
        let backend_kind = self.backend.kind().to_string();
        Ok(JobConfig {
            name: self.name,
            script: self.script,
            log_path: self.log_path,
            args: self.args,
            tags: self.tags,
            parent_tags: self.parent_tags,
            max_retries: self.max_retries,
            n_retries: 0,
            output: self.output,
            job_type: self.job_type,
            modes: Status::ALL.iter().map(|s| (*s, Mode::Active)).collect(),
            status: Status::Configured,
            job_id: None,
            exitcode: None,
            starttime: self.starttime,
            backend_kind,
            finished_func: self.finished_func,
            success_func: self.success_func,
            post_func: self.post_func,
            dirty: true,
            backend: Some(self.backend),
        })
    }
}

/// A detached local child process and its still-open output handles.
struct LocalProcess {
    child: Child,
}

/// A job instance: its persistent config plus (for LOCAL jobs) the live
/// child process handle. Only [`JobConfig`] is serialised; `Job` itself is
/// a runtime wrapper reconstructed around a reloaded config.
pub struct Job {
    pub config: JobConfig,
    local: Option<LocalProcess>,
}

impl Job {
    pub fn new(config: JobConfig) -> Self {
        Self { config, local: None }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn tags(&self) -> &HashSet<String> {
        &self.config.tags
    }

    pub fn parent_tags(&self) -> &HashSet<String> {
        &self.config.parent_tags
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.config.has_tag(tag)
    }

    pub fn has_tags(&self, tags: &HashSet<String>) -> bool {
        self.config.has_tags(tags)
    }

    pub fn job_type(&self) -> Type {
        self.config.job_type
    }

    /// Set the job's type. Fails unless the job is CONFIGURED.
    pub fn set_type(&mut self, job_type: Type) -> CoreResult<()> {
        if self.config.status != Status::Configured {
            return Err(CoreError::TypeChangeNotConfigured(self.config.name.clone()));
        }
        self.config.job_type = job_type;
        self.config.mark_dirty();
        Ok(())
    }

    pub fn status(&self) -> Status {
        self.config.status
    }

    pub fn job_id(&self) -> Option<&str> {
        self.config.job_id.as_deref()
    }

    pub fn output(&self) -> Option<&Path> {
        self.config.output.as_deref()
    }

    pub fn starttime(&self) -> Option<u64> {
        self.config.starttime
    }

    pub fn set_starttime(&mut self, epoch_ms: u64) {
        self.config.starttime = Some(epoch_ms);
        self.config.mark_dirty();
    }

    pub fn mode(&self) -> Mode {
        self.config.mode(self.config.status)
    }

    pub fn get_mode(&self, status: Status) -> Mode {
        self.config.mode(status)
    }

    pub fn set_mode(&mut self, status: Status, mode: Mode) {
        self.config.set_mode(status, mode);
    }

    /// Lazily fetches the exitcode from the backend for BATCH jobs whose
    /// config does not have one cached yet.
    pub fn exitcode(&mut self) -> Option<String> {
        if self.config.job_type == Type::Batch && self.config.exitcode.is_none() {
            if let Some(backend) = self.config.backend.clone() {
                if let Ok(code) = backend.exitcode() {
                    self.config.exitcode = Some(code);
                    self.config.mark_dirty();
                }
            }
        }
        self.config.exitcode.clone()
    }

    fn successcode(&self) -> String {
        if self.config.job_type == Type::Local {
            "0".to_string()
        } else {
            self.config
                .backend
                .as_ref()
                .map(|b| b.successcode().to_string())
                .unwrap_or_default()
        }
    }

    /// Submit the job. Precondition: CONFIGURED.
    pub fn submit(&mut self) -> CoreResult<Status> {
        if self.config.status != Status::Configured {
            return Err(CoreError::NotConfigured(self.config.name.clone()));
        }
        if self.config.job_type == Type::Local {
            let mut command = Command::new("/bin/bash");
            command.arg(&self.config.script);
            command.args(&self.config.args);
            command.stdout(Stdio::piped());
            command.stderr(Stdio::piped());
            // Detach into its own process group so a Ctrl-C delivered to the
            // controller's foreground group does not also reach the child.
            #[cfg(unix)]
            {
                use std::os::unix::process::CommandExt;
                command.process_group(0);
            }
            let child = command
                .spawn()
                .map_err(|e| CoreError::LocalProcess(self.config.name.clone(), e))?;
            self.local = Some(LocalProcess { child });
        } else if let Some(backend) = self.config.backend.clone() {
            let id = backend.submit()?;
            self.config.job_id = Some(id);
        }
        self.set_status(Status::Running);
        Ok(self.config.status)
    }

    /// Cancel the job. No-op if FAILED.
    pub fn cancel(&mut self, clear_retry: bool) -> CoreResult<Status> {
        if self.config.status == Status::Failed {
            return Ok(self.config.status);
        }
        if self.config.status == Status::Running {
            if self.config.job_type == Type::Local {
                self.stop_local();
            } else if let Some(backend) = self.config.backend.clone() {
                backend.cancel()?;
            }
        }
        self.set_status(Status::Cancelled);
        if clear_retry {
            self.config.max_retries = 0;
            self.config.mark_dirty();
        }
        Ok(self.config.status)
    }

    /// Wipe live state back to CONFIGURED. Used by `retry` and session reset.
    pub fn reset(&mut self, reset_retries: bool) {
        self.config.status = Status::Configured;
        self.config.exitcode = None;
        self.config.job_id = None;
        self.local = None;
        let _ = std::fs::remove_file(&self.config.log_path);
        if reset_retries {
            self.config.n_retries = 0;
        }
        self.config.mark_dirty();
    }

    fn do_retry(&self) -> bool {
        self.config.max_retries > 0 && self.config.n_retries < self.config.max_retries
    }

    /// Whether this job has retry budget left. Used by the dependency
    /// resolver's cascade-cancel check (spec.md §4.4): a FAILED/CANCELLED
    /// parent only cascades a cancellation onto its children once it can no
    /// longer retry.
    pub fn can_retry(&self) -> bool {
        self.do_retry()
    }

    /// Internal retry path used by the scheduler.
    pub fn retry(
        &mut self,
        force: bool,
        submit: bool,
        ignore_max_retries: bool,
        new_type: Option<Type>,
    ) -> CoreResult<Status> {
        if !ignore_max_retries && !self.do_retry() {
            return Ok(self.config.status);
        }
        if self.config.status == Status::Running {
            if force {
                self.cancel(false)?;
            } else {
                return Err(CoreError::RunningRetryRefused(self.config.name.clone()));
            }
        }
        self.reset(false);
        if let Some(t) = new_type {
            self.config.job_type = t;
        }
        self.config.n_retries += 1;
        self.config.mark_dirty();
        if submit {
            self.submit()
        } else {
            Ok(self.config.status)
        }
    }

    /// The state-advancing query. Mutates `self.config.status` in place and
    /// returns the (possibly updated) status.
    pub fn get_status(&mut self, skip_eval: bool, force_success_check: bool) -> CoreResult<Status> {
        if skip_eval {
            return Ok(self.config.status);
        }
        if self.config.status == Status::Running {
            if self.config.job_type != Type::Local
                && self.config.mode(Status::Running) == Mode::Passive
            {
                return Ok(self.config.status);
            }
            if self.config.job_type == Type::Local {
                self.poll_local();
            } else if let Some(predicate) = self.config.finished_func.clone() {
                let code = self.successcode();
                let finished = predicate.evaluate(&self.config, &code);
                self.set_status(if finished { Status::Finished } else { Status::Running });
            } else if let Some(backend) = self.config.backend.clone() {
                let status = backend.status()?;
                self.set_status(status);
            }
        }
        if self.config.status == Status::Finished {
            if self.config.mode(Status::Finished) == Mode::Passive && !force_success_check {
                return Ok(self.config.status);
            }
            let success = self.is_success();
            self.set_status(if success { Status::Success } else { Status::Failed });
        }
        Ok(self.config.status)
    }

    /// Apply a Listener's payload entry to this job: the only path by which
    /// a job in PASSIVE mode advances (spec.md §4.6). Goes through the same
    /// `set_status` the job's own active evaluation uses, so the completion
    /// hook still fires exactly once on a terminal transition.
    pub fn apply_listener_update(&mut self, status: Option<Status>, exitcode: Option<String>) {
        if let Some(code) = exitcode {
            self.config.exitcode = Some(code);
            self.config.mark_dirty();
        }
        if let Some(status) = status {
            self.set_status(status);
        }
    }

    fn poll_local(&mut self) {
        let exit_code = self
            .local
            .as_mut()
            .and_then(|local| local.child.try_wait().ok().flatten())
            .and_then(|status| status.code());
        if let Some(code) = exit_code {
            self.config.exitcode = Some(code.to_string());
            self.config.mark_dirty();
            self.set_status(Status::Finished);
        }
    }

    fn is_success(&mut self) -> bool {
        if let Some(predicate) = self.config.success_func.clone() {
            let code = self.successcode();
            predicate.evaluate(&self.config, &code)
        } else {
            let code = self.successcode();
            self.exitcode().as_deref() == Some(code.as_str())
        }
    }

    /// Set status, firing the completion hook exactly once whenever the
    /// transition crosses from pre-completion into a terminal status.
    fn set_status(&mut self, status: Status) {
        if self.config.status < Status::Success && status >= Status::Success {
            self.complete();
        }
        self.config.status = status;
        self.config.mark_dirty();
    }

    /// Run the completion routine: the post hook, then (for LOCAL jobs)
    /// flush captured output to the log file and release the process.
    fn complete(&mut self) {
        if let Some(post) = self.config.post_func.clone() {
            post.apply(&self.config);
        }
        if self.config.job_type == Type::Local {
            self.write_log();
            self.stop_local();
        }
    }

    fn write_log(&mut self) {
        let mut buf = Vec::new();
        if let Some(local) = self.local.as_mut() {
            if let Some(mut out) = local.child.stdout.take() {
                let _ = out.read_to_end(&mut buf);
            }
            if let Some(mut err) = local.child.stderr.take() {
                let _ = err.read_to_end(&mut buf);
            }
        }
        let _ = std::fs::write(&self.config.log_path, &buf);
    }

    /// Close the child's output streams before terminating it, so a child
    /// blocked on a full pipe is unwedged rather than left to hang.
    fn stop_local(&mut self) {
        if let Some(mut local) = self.local.take() {
            let _ = local.child.stdout.take();
            let _ = local.child.stderr.take();
            let _ = local.child.kill();
            let _ = local.child.wait();
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl JobConfig {
    /// Build a ready-to-use config for tests: a BATCH job wired to a
    /// [`crate::test_support::StubBackend`], with test defaults for
    /// everything else. Chain the builder's setters to customise it.
    pub fn for_test(name: impl Into<String>) -> JobConfigBuilder {
        let name = name.into();
        let backend = Arc::new(crate::test_support::StubBackend::default());
        JobConfig::builder(
            name.clone(),
            PathBuf::from(format!("/tmp/{name}.sh")),
            PathBuf::from(format!("/tmp/{name}.log")),
            backend,
        )
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
