// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sum-type stand-ins for the dynamic `finished_func` / `success_func` /
//! `post_func` callables of the job config.
//!
//! The scheduler never inspects which variant it holds beyond calling
//! [`Predicate::evaluate`] or [`PostAction::apply`] — callers that need the
//! built-in exit-code comparison pass it in explicitly since that check
//! needs the backend's success string, which the predicate itself does not
//! own.

use crate::job::JobConfig;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// A boolean condition evaluated against a job's live config.
///
/// Used for both `finished_func` ("has the process left RUNNING?") and
/// `success_func` ("did it succeed?") — the two call sites differ only in
/// when they invoke `evaluate`, not in the shape of the condition.
#[derive(Clone)]
pub enum Predicate {
    /// Defer to the caller's built-in exit-code comparison.
    DefaultExitCodeCheck,
    /// True once the given path exists on disk. `max_attempts` bounds how
    /// many consecutive listener ticks may observe it missing before the
    /// scheduler gives up and fails the job (see [`crate::job::Job`]).
    OutputFilePresent { path: PathBuf, max_attempts: u32 },
    /// User-supplied closure, the typed stand-in for a passed-in callable.
    UserCustom(Arc<dyn Fn(&JobConfig) -> bool + Send + Sync>),
}

impl Predicate {
    pub fn output_file(path: PathBuf, max_attempts: u32) -> Self {
        Predicate::OutputFilePresent { path, max_attempts }
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&JobConfig) -> bool + Send + Sync + 'static,
    {
        Predicate::UserCustom(Arc::new(f))
    }

    /// Evaluate the predicate. `successcode` is the backend's (or LOCAL's
    /// synthetic `"0"`) declared success string, consulted only by
    /// [`Predicate::DefaultExitCodeCheck`].
    pub fn evaluate(&self, config: &JobConfig, successcode: &str) -> bool {
        match self {
            Predicate::DefaultExitCodeCheck => {
                config.exitcode.as_deref() == Some(successcode)
            }
            Predicate::OutputFilePresent { path, .. } => path.is_file(),
            Predicate::UserCustom(f) => f(config),
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::DefaultExitCodeCheck => write!(f, "DefaultExitCodeCheck"),
            Predicate::OutputFilePresent { path, max_attempts } => f
                .debug_struct("OutputFilePresent")
                .field("path", path)
                .field("max_attempts", max_attempts)
                .finish(),
            Predicate::UserCustom(_) => write!(f, "UserCustom(..)"),
        }
    }
}

/// Side-effecting action run once, on entering a terminal status.
#[derive(Clone)]
pub enum PostAction {
    UserCustom(Arc<dyn Fn(&JobConfig) + Send + Sync>),
}

impl PostAction {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&JobConfig) + Send + Sync + 'static,
    {
        PostAction::UserCustom(Arc::new(f))
    }

    pub fn apply(&self, config: &JobConfig) {
        match self {
            PostAction::UserCustom(f) => f(config),
        }
    }
}

impl fmt::Debug for PostAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostAction::UserCustom(_) => write!(f, "UserCustom(..)"),
        }
    }
}
