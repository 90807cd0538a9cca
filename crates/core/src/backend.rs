// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Backend seam: Job's only collaborator outside its own config.
//!
//! Concrete adapters (a Slurm-like scheduler CLI, a container runtime, ...)
//! are collaborators outside this crate's scope — only the contract lives
//! here, because [`crate::job::Job`] needs it to drive BATCH execution.

use crate::job::JobConfig;
use crate::status::Status;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend command `{command}` failed: {message}")]
    CommandFailed { command: String, message: String },

    #[error("required backend executable not found on PATH: {0}")]
    MissingExecutable(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// One polled update for a single backend id, as produced by a Listener
/// tick. Only the fields the payload actually carries are `Some`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListenerUpdate {
    pub status: Option<Status>,
    pub exitcode: Option<String>,
}

/// A per-backend polling function. Called once per listener tick; returns
/// the latest known state for every backend id it currently tracks. Owned
/// by a Listener, never called directly by a [`crate::job::Job`].
pub type ListenFn = Box<dyn FnMut() -> HashMap<String, ListenerUpdate> + Send>;

/// External job execution system adapter.
pub trait Backend: Send + Sync + std::fmt::Debug {
    /// Short identifier used to re-link a reloaded [`crate::job::JobConfig`]
    /// to a live backend instance (e.g. `"slurm"`, `"htcondor"`, `"test"`).
    fn kind(&self) -> &str;

    /// Materialise the run-script for this job under `dir`: copy `config`'s
    /// source script verbatim (or fall back to a trivial body if it is not
    /// yet a file on disk), apply the configured wrapper prelude, and
    /// ensure the `#!/bin/bash` shebang and executable permissions.
    /// Idempotent.
    fn write_script(&self, config: &JobConfig, dir: &Path) -> BackendResult<PathBuf>;

    fn submit(&self) -> BackendResult<String>;
    fn cancel(&self) -> BackendResult<()>;
    /// At least distinguishes "still running" from "finished".
    fn status(&self) -> BackendResult<Status>;
    fn exitcode(&self) -> BackendResult<String>;

    /// Return a fresh polling function for a Listener to drive.
    fn get_listen_func(&self) -> ListenFn;

    /// Exit-code string compared against `exitcode()` for the default
    /// success verdict (e.g. `"0:0"`).
    fn successcode(&self) -> &str;

    /// Executables that must be present on PATH; absence triggers the
    /// backend-unavailable error / test-mode prompt.
    fn commands(&self) -> &[&str];
}
