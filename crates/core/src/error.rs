// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types shared by the job data model.

use thiserror::Error;

/// Errors raised while mutating or querying a [`crate::job::Job`] or
/// [`crate::container::JobContainer`].
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("job name `{0}` is not a valid identifier (must not contain '.', '-', '/', or whitespace)")]
    InvalidName(String),

    #[error("job name `{0}` is already in use in this session")]
    DuplicateName(String),

    #[error("no job named `{0}` in this container")]
    UnknownJob(String),

    #[error("backend id `{0}` is already registered to job `{1}`")]
    DuplicateBackendId(String, String),

    #[error("cannot submit job `{0}`: not in CONFIGURED state")]
    NotConfigured(String),

    #[error("cannot change type of job `{0}`: not in CONFIGURED state")]
    TypeChangeNotConfigured(String),

    #[error("job `{0}` is still RUNNING; pass force=true to retry")]
    RunningRetryRefused(String),

    #[error("local process error for job `{0}`: {1}")]
    LocalProcess(String, #[source] std::io::Error),

    #[error(transparent)]
    Backend(#[from] crate::backend::BackendError),
}

pub type CoreResult<T> = Result<T, CoreError>;
