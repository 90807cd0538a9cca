// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! jg-storage: the crash-resilient snapshot protocol (spec.md §4.7).
//!
//! Two tiers live under `<work_dir>/<session_name>/snapshot/`: one file per
//! [`JobConfig`] and one [`JobHandlerConfig`] file for the whole session.
//! Every config carries a `dirty` flag; `write_job_if_dirty`/
//! `write_session_if_dirty` only touch disk when it is set, and clear it on
//! a successful write — the coalescing spec.md §4.7 asks for.
//!
//! The format is a small JSON envelope carrying a `runtime_major_version`
//! field, zstd-compressed on disk (spec.md §4.7: "an opaque
//! self-describing binary"); [`SnapshotStore::read_job`]/`read_session`
//! fail fast with [`SnapshotError::VersionMismatch`] if a reloaded file's
//! version does not match this build's, rather than attempt a best-effort
//! decode.
//!
//! [`JobConfig`]'s `finished_func`/`success_func`/`post_func`/`backend`
//! fields are `#[serde(skip)]` (they hold closures/trait objects that
//! cannot cross a serialisation boundary) — a reloaded config comes back
//! with all of them `None`; the session owner re-links predicates and a
//! live `Backend` using `backend_kind` before resuming the job (spec.md §9
//! "Snapshot cyclic references").

use jg_core::{JobConfig, JobHandlerConfig};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Bumped whenever the on-disk shape of [`JobConfig`] or
/// [`JobHandlerConfig`] changes incompatibly.
pub const RUNTIME_MAJOR_VERSION: u32 = 1;

const SESSION_FILE: &str = "JobHandlerConfig.json";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to decode snapshot at {path}: {source}")]
    Decode { path: PathBuf, #[source] source: serde_json::Error },

    #[error(
        "snapshot at {path} was written by runtime major version {found}, this build is {expected}"
    )]
    VersionMismatch { path: PathBuf, expected: u32, found: u32 },
}

pub type SnapshotResult<T> = Result<T, SnapshotError>;

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct Envelope<T> {
    runtime_major_version: u32,
    payload: T,
}

/// Durable store for one session's snapshot directory.
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(snapshot_dir: impl Into<PathBuf>) -> Self {
        Self { dir: snapshot_dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn job_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    fn session_path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }

    /// Force-write a job config, ignoring its `dirty` flag.
    pub fn write_job(&self, config: &JobConfig) -> SnapshotResult<()> {
        write_versioned(&self.job_path(&config.name), config)
    }

    /// Write `config` only if `dirty`; clears the flag on success. Returns
    /// whether a write happened.
    pub fn write_job_if_dirty(&self, config: &mut JobConfig) -> SnapshotResult<bool> {
        if !config.dirty {
            return Ok(false);
        }
        self.write_job(config)?;
        config.dirty = false;
        Ok(true)
    }

    pub fn read_job(&self, name: &str) -> SnapshotResult<JobConfig> {
        read_versioned(&self.job_path(name))
    }

    /// Force-write the session config, ignoring its `dirty` flag.
    pub fn write_session(&self, config: &JobHandlerConfig) -> SnapshotResult<()> {
        write_versioned(&self.session_path(), config)
    }

    /// Write the session config only if `dirty`; clears the flag on
    /// success. The JobHandler's update may skip per-job writes when only
    /// session-level state changed (spec.md §4.7) — callers do that by
    /// simply not calling `write_job_if_dirty` for jobs that didn't change.
    pub fn write_session_if_dirty(&self, config: &mut JobHandlerConfig) -> SnapshotResult<bool> {
        if !config.dirty {
            return Ok(false);
        }
        self.write_session(config)?;
        config.dirty = false;
        Ok(true)
    }

    pub fn read_session(&self) -> SnapshotResult<JobHandlerConfig> {
        read_versioned(&self.session_path())
    }

    /// Every job name with a snapshot file on disk (excluding the session
    /// file), in no particular order — callers reload by walking
    /// `JobHandlerConfig::job_config_paths` instead when declaration order
    /// matters.
    pub fn list_job_names(&self) -> SnapshotResult<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else { continue };
            if file_name == SESSION_FILE {
                continue;
            }
            if let Some(stem) = file_name.strip_suffix(".json") {
                names.push(stem.to_string());
            }
        }
        Ok(names)
    }
}

/// zstd compression level for snapshot bodies. Snapshots are written often
/// (every dirty job, every tick) and read rarely (only on reload), so this
/// favours write speed over ratio.
const ZSTD_LEVEL: i32 = 3;

/// Write `value` as a versioned, zstd-compressed JSON envelope, rotating
/// any existing file at `path` into a `.bak` sibling first and writing
/// through a temp file + rename so a crash mid-write never leaves a
/// half-written snapshot.
fn write_versioned<T: Serialize>(path: &Path, value: &T) -> SnapshotResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    if path.exists() {
        let mut bak = path.as_os_str().to_os_string();
        bak.push(".bak");
        fs::copy(path, PathBuf::from(bak))?;
    }
    let envelope = Envelope { runtime_major_version: RUNTIME_MAJOR_VERSION, payload: value };
    let json = serde_json::to_vec(&envelope)
        .map_err(|source| SnapshotError::Decode { path: path.to_path_buf(), source })?;
    let bytes = zstd::stream::encode_all(&json[..], ZSTD_LEVEL)?;

    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    tracing::debug!(path = %path.display(), "wrote snapshot");
    Ok(())
}

#[derive(serde::Deserialize)]
struct VersionOnly {
    runtime_major_version: u32,
}

fn read_versioned<T: DeserializeOwned>(path: &Path) -> SnapshotResult<T> {
    let compressed = fs::read(path)?;
    let bytes = zstd::stream::decode_all(&compressed[..])?;

    // Peek the version tag before attempting to decode the full payload,
    // so an incompatible-version snapshot fails with `VersionMismatch`
    // rather than a confusing decode error about fields that moved.
    let version: VersionOnly = serde_json::from_slice(&bytes)
        .map_err(|source| SnapshotError::Decode { path: path.to_path_buf(), source })?;
    if version.runtime_major_version != RUNTIME_MAJOR_VERSION {
        return Err(SnapshotError::VersionMismatch {
            path: path.to_path_buf(),
            expected: RUNTIME_MAJOR_VERSION,
            found: version.runtime_major_version,
        });
    }

    let envelope: Envelope<T> = serde_json::from_slice(&bytes)
        .map_err(|source| SnapshotError::Decode { path: path.to_path_buf(), source })?;
    Ok(envelope.payload)
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
