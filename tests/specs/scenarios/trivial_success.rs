// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::support::{write_script, BATCH_SUCCESS_EXITCODE};
use jg_backend::TestBackend;
use jg_core::{Job, JobConfig, Status};
use std::sync::Arc;
use tempfile::tempdir;

#[test]
fn a_single_batch_job_reaches_success() {
    let dir = tempdir().unwrap();
    let script = dir.path().join("a.sh");
    write_script(&script, "echo test");

    let config = JobConfig::builder("a", script, dir.path().join("a.log"), Arc::new(TestBackend::new()))
        .build()
        .unwrap();
    let mut job = Job::new(config);

    job.submit().unwrap();
    let status = job.get_status(false, false).unwrap();

    assert_eq!(status, Status::Success);
    assert_eq!(job.exitcode().as_deref(), Some(BATCH_SUCCESS_EXITCODE));
}
