// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use jg_core::{Backend, BackendResult, JobConfig, ListenFn, ListenerUpdate, Status};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
struct TestState {
    status: Status,
    exitcode: String,
}

/// A [`Backend`] that never shells out. Used whenever a session runs with
/// `Options::test_mode = true` (spec.md §7 "Backend-unavailable" — no real
/// scheduler executable on PATH) and by every other crate's tests that need
/// a `Backend` without exercising a real adapter.
///
/// Default behaviour resolves every submitted job to SUCCESS immediately —
/// appropriate for a dry run. Under the `test-support` feature, tests can
/// override the resolved verdict and drive a listener payload directly, to
/// exercise PASSIVE-mode code paths without a real poller.
#[derive(Debug)]
pub struct TestBackend {
    state: Mutex<TestState>,
    listen_payload: Arc<Mutex<HashMap<String, ListenerUpdate>>>,
    next_id: AtomicU64,
    successcode: String,
    /// Per-backend-kind prelude template applied around a job's script body
    /// in `write_script` (SPEC_FULL.md "command_wrapper per-backend
    /// prelude"); `None` leaves the body untouched.
    wrapper: Option<String>,
}

impl Default for TestBackend {
    fn default() -> Self {
        Self {
            state: Mutex::new(TestState { status: Status::Finished, exitcode: "0:0".to_string() }),
            listen_payload: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
            successcode: "0:0".to_string(),
            wrapper: None,
        }
    }
}

impl TestBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap every job's script body in `template`. A template containing a
    /// literal `{command}` substitutes the script body in place; otherwise
    /// the template is emitted as a prelude followed by the body on its own
    /// line, mirroring `jg_engine::Options::wrap_command`.
    pub fn with_wrapper(mut self, template: impl Into<String>) -> Self {
        self.wrapper = Some(template.into());
        self
    }
}

#[cfg(feature = "test-support")]
impl TestBackend {
    /// Force the status/exitcode this backend reports from `status()` /
    /// `exitcode()` for every job it has "submitted" — the simplest way to
    /// drive a deterministic FAILED or still-RUNNING scenario in a test.
    pub fn force_result(&self, status: Status, exitcode: impl Into<String>) {
        let mut state = self.state.lock();
        state.status = status;
        state.exitcode = exitcode.into();
    }

    /// A handle into the payload `get_listen_func` serves, so a test can
    /// simulate out-of-band scheduler polls for PASSIVE-mode jobs.
    pub fn listen_payload(&self) -> Arc<Mutex<HashMap<String, ListenerUpdate>>> {
        self.listen_payload.clone()
    }
}

impl Backend for TestBackend {
    fn kind(&self) -> &str {
        "test"
    }

    /// Idempotent: copies the source script verbatim (falling back to a
    /// trivial no-op body if it is not yet a file — e.g. the caller wrote
    /// only a path placeholder), applies the configured wrapper prelude,
    /// then ensures the `#!/bin/bash` shebang and sets all-exec
    /// permissions, matching the on-disk layout contract (spec.md §6).
    fn write_script(&self, config: &JobConfig, dir: &Path) -> BackendResult<PathBuf> {
        fs::create_dir_all(dir)?;
        let dest = dir.join(&config.name);
        let source = fs::read_to_string(&config.script)
            .unwrap_or_else(|_| "#!/bin/bash\nexit 0\n".to_string());
        let body = source.strip_prefix("#!/bin/bash\n").unwrap_or(&source);
        let wrapped = match &self.wrapper {
            Some(template) if template.contains("{command}") => template.replace("{command}", body),
            Some(template) => format!("{template}\n{body}"),
            None => body.to_string(),
        };
        fs::write(&dest, format!("#!/bin/bash\n{wrapped}"))?;
        set_executable(&dest)?;
        Ok(dest)
    }

    fn submit(&self) -> BackendResult<String> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(format!("test-{id}"))
    }

    fn cancel(&self) -> BackendResult<()> {
        let mut state = self.state.lock();
        state.status = Status::Cancelled;
        Ok(())
    }

    fn status(&self) -> BackendResult<Status> {
        Ok(self.state.lock().status)
    }

    fn exitcode(&self) -> BackendResult<String> {
        Ok(self.state.lock().exitcode.clone())
    }

    fn get_listen_func(&self) -> ListenFn {
        let payload = self.listen_payload.clone();
        Box::new(move || payload.lock().clone())
    }

    fn successcode(&self) -> &str {
        &self.successcode
    }

    fn commands(&self) -> &[&str] {
        &[]
    }
}

#[cfg(unix)]
fn set_executable(path: &Path) -> BackendResult<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> BackendResult<()> {
    Ok(())
}
