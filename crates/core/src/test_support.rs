// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::backend::{Backend, BackendResult, ListenFn, ListenerUpdate};
use crate::job::JobConfig;
use crate::status::Status;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Proptest strategies for the core state machine types.
#[cfg(any(test, feature = "test-support"))]
pub mod strategies {
    use crate::status::{Mode, Status, Type};
    use proptest::prelude::*;

    pub fn arb_status() -> impl Strategy<Value = Status> {
        prop_oneof![
            Just(Status::Configured),
            Just(Status::Running),
            Just(Status::Finished),
            Just(Status::Success),
            Just(Status::Failed),
            Just(Status::Cancelled),
        ]
    }

    pub fn arb_type() -> impl Strategy<Value = Type> {
        prop_oneof![Just(Type::Batch), Just(Type::Local)]
    }

    pub fn arb_mode() -> impl Strategy<Value = Mode> {
        prop_oneof![Just(Mode::Active), Just(Mode::Passive)]
    }

    /// Arbitrary job names composed only of ASCII letters/digits/underscore
    /// — i.e. always valid per [`crate::job::validate_name`].
    pub fn arb_job_name() -> impl Strategy<Value = String> {
        "[a-zA-Z][a-zA-Z0-9_]{0,15}"
    }
}

#[derive(Debug, Clone)]
struct StubState {
    status: Status,
    exitcode: Option<String>,
    submit_count: u32,
    cancelled: bool,
}

/// A configurable in-memory [`Backend`] stub, used both by `jg-core`'s own
/// tests and by downstream crates under the `test-support` feature —
/// production code should never depend on this, only `test_mode` swaps a
/// session's real adapters for one of these.
#[derive(Debug)]
pub struct StubBackend {
    state: Mutex<StubState>,
    listen_payload: Arc<Mutex<HashMap<String, ListenerUpdate>>>,
    next_id: AtomicU64,
    successcode: String,
    commands: Vec<&'static str>,
}

impl Default for StubBackend {
    fn default() -> Self {
        Self {
            state: Mutex::new(StubState {
                status: Status::Running,
                exitcode: None,
                submit_count: 0,
                cancelled: false,
            }),
            listen_payload: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
            successcode: "0:0".to_string(),
            commands: Vec::new(),
        }
    }
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle into the payload the listen function serves; tests push
    /// `{id: update}` entries here to simulate out-of-band scheduler polls.
    pub fn listen_payload(&self) -> Arc<Mutex<HashMap<String, ListenerUpdate>>> {
        self.listen_payload.clone()
    }

    /// Pre-seed the status/exitcode this backend will report for `status()`
    /// / `exitcode()` once queried (ACTIVE-mode path).
    pub fn set_result(&self, status: Status, exitcode: impl Into<String>) {
        let mut state = self.state.lock();
        state.status = status;
        state.exitcode = Some(exitcode.into());
    }

    pub fn submit_count(&self) -> u32 {
        self.state.lock().submit_count
    }

    pub fn was_cancelled(&self) -> bool {
        self.state.lock().cancelled
    }
}

impl Backend for StubBackend {
    fn kind(&self) -> &str {
        "test"
    }

    fn write_script(&self, config: &JobConfig, dir: &Path) -> BackendResult<PathBuf> {
        let dest = dir.join(format!("{}.sh", config.name));
        let body = std::fs::read_to_string(&config.script)
            .unwrap_or_else(|_| "#!/bin/bash\nexit 0\n".to_string());
        std::fs::write(&dest, body)?;
        Ok(dest)
    }

    fn submit(&self) -> BackendResult<String> {
        let mut state = self.state.lock();
        state.submit_count += 1;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(format!("stub-{id}"))
    }

    fn cancel(&self) -> BackendResult<()> {
        self.state.lock().cancelled = true;
        Ok(())
    }

    fn status(&self) -> BackendResult<Status> {
        Ok(self.state.lock().status)
    }

    fn exitcode(&self) -> BackendResult<String> {
        Ok(self.state.lock().exitcode.clone().unwrap_or_else(|| self.successcode.clone()))
    }

    fn get_listen_func(&self) -> ListenFn {
        let payload = self.listen_payload.clone();
        Box::new(move || payload.lock().clone())
    }

    fn successcode(&self) -> &str {
        &self.successcode
    }

    fn commands(&self) -> &[&str] {
        &self.commands
    }
}
