// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `JobHandlerConfig` — the persistent, session-wide counterpart to
//! [`crate::job::JobConfig`] (spec.md §3).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Session-wide persistent configuration: directory layout, defaults
/// inheritable by jobs, concurrency caps, feature flags, and the index of
/// on-disk [`crate::job::JobConfig`] snapshot paths used to reload a
/// session from scratch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobHandlerConfig {
    pub name: String,
    pub work_dir: PathBuf,
    pub default_backend: String,
    pub default_max_retries: u32,

    /// Absolute cap on concurrent LOCAL jobs.
    pub local_max: u32,
    /// When set, CONFIGURED BATCH jobs are re-typed to LOCAL opportunistically
    /// until `local_max` is filled.
    pub local_dynamic: bool,
    /// Cap on total jobs in RUNNING, across both BATCH and LOCAL.
    pub run_max: Option<u32>,

    pub listens: bool,
    pub do_snapshot: bool,
    pub output_max_attempts: u32,

    /// Declaration-order index of every job-config snapshot path belonging
    /// to this session; authoritative for reload.
    pub job_config_paths: Vec<PathBuf>,

    #[serde(skip)]
    pub dirty: bool,
}

impl JobHandlerConfig {
    pub fn new(name: impl Into<String>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            work_dir: work_dir.into(),
            default_backend: "test".to_string(),
            default_max_retries: 0,
            local_max: 0,
            local_dynamic: false,
            run_max: None,
            listens: false,
            do_snapshot: true,
            output_max_attempts: 5,
            job_config_paths: Vec::new(),
            dirty: true,
        }
    }

    crate::setters! {
        into {
            default_backend: String,
        }
        set {
            local_max: u32,
            local_dynamic: bool,
            listens: bool,
            do_snapshot: bool,
            output_max_attempts: u32,
            default_max_retries: u32,
        }
        option {
            run_max: u32,
        }
    }

    pub fn session_dir(&self) -> PathBuf {
        self.work_dir.join(&self.name)
    }

    pub fn scripts_dir(&self) -> PathBuf {
        self.session_dir().join("scripts")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.session_dir().join("logs")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.session_dir().join("output")
    }

    pub fn snapshot_dir(&self) -> PathBuf {
        self.session_dir().join("snapshot")
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.session_dir().join("tmp")
    }

    pub fn script_path(&self, job_name: &str) -> PathBuf {
        self.scripts_dir().join(job_name)
    }

    pub fn log_path(&self, job_name: &str) -> PathBuf {
        self.logs_dir().join(job_name)
    }

    /// Register a job-config snapshot path if it is not already tracked.
    pub fn track_job_path(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.job_config_paths.contains(&path) {
            self.job_config_paths.push(path);
            self.dirty = true;
        }
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}

#[cfg(any(test, feature = "test-support"))]
impl JobHandlerConfig {
    pub fn for_test(name: impl Into<String>, work_dir: impl AsRef<Path>) -> Self {
        Self::new(name, work_dir.as_ref().to_path_buf())
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
