// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for the end-to-end scenario and invariant specs.

use jg_backend::TestBackend;
use jg_core::{Job, JobConfig, JobHandlerConfig};
use jg_engine::{Options, Scheduler};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Write `body` (without a shebang) to `path` as an executable bash script.
pub fn write_script(path: &Path, body: &str) {
    std::fs::write(path, format!("#!/bin/bash\n{body}\n")).unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(path, perms).unwrap();
    }
}

/// A standalone [`Job`] wired to a fresh [`TestBackend`], for specs that
/// drive the state machine directly rather than through a [`Scheduler`].
pub fn local_job(dir: &TempDir, name: &str, body: &str) -> Job {
    let script = dir.path().join(format!("{name}.sh"));
    write_script(&script, body);
    let config = JobConfig::builder(name, script, dir.path().join(format!("{name}.log")), Arc::new(TestBackend::new()))
        .job_type(jg_core::Type::Local)
        .build()
        .unwrap();
    Job::new(config)
}

/// Poll a condition every 20ms until it's true or `timeout` elapses.
/// Returns whether the condition was observed true.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    loop {
        if condition() {
            return true;
        }
        if start.elapsed() >= timeout {
            return false;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

/// Drive a real-clock `Scheduler` with repeated `tick(false)` calls until
/// every job is terminal or `timeout` elapses.
pub fn run_until_done(scheduler: &mut Scheduler, timeout: Duration) -> bool {
    wait_until(timeout, || {
        scheduler.tick(false).unwrap();
        scheduler.is_done()
    })
}

pub fn scheduler_with(dir: &TempDir, configure: impl FnOnce(JobHandlerConfig) -> JobHandlerConfig) -> Scheduler {
    let session = configure(JobHandlerConfig::for_test("s", dir.path()));
    Scheduler::new(session, Options::new(dir.path())).unwrap()
}

/// The backend-neutral success verdict every `TestBackend`-resolved BATCH
/// job reaches by default.
pub const BATCH_SUCCESS_EXITCODE: &str = "0:0";
