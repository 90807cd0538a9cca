// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors raised by the dependency resolver and scheduler.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] jg_core::CoreError),

    #[error(transparent)]
    Backend(#[from] jg_core::BackendError),

    #[error(transparent)]
    Snapshot(#[from] jg_storage::SnapshotError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A job declares a `parent_tag` no job in the session carries
    /// (spec.md §3 invariant 7 / §4.4).
    #[error("job `{job}` depends on parent tag `{tag}`, which no job in this session carries")]
    UnknownParentTag { job: String, tag: String },

    /// A user or finished/success predicate raised an error while
    /// evaluating; per spec.md §7 these propagate and cancel the session.
    #[error("predicate for job `{job}` failed: {message}")]
    PredicateFailed { job: String, message: String },
}

pub type EngineResult<T> = Result<T, EngineError>;
