// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::support::write_script;
use jg_backend::TestBackend;
use jg_core::{Job, JobConfig, Status};
use std::sync::Arc;
use tempfile::tempdir;

#[test]
fn a_failed_job_succeeds_once_its_script_is_rewritten_and_retried() {
    let dir = tempdir().unwrap();
    let script = dir.path().join("a.sh");
    write_script(&script, "exit 1");

    let backend = Arc::new(TestBackend::new());
    backend.force_result(Status::Finished, "1");
    let config = JobConfig::builder("a", script.clone(), dir.path().join("a.log"), backend.clone())
        .max_retries(0)
        .build()
        .unwrap();
    let mut job = Job::new(config);

    job.submit().unwrap();
    job.get_status(false, false).unwrap();
    assert_eq!(job.status(), Status::Failed);

    write_script(&script, "echo ok");
    backend.force_result(Status::Finished, "0:0");
    job.reset(false);
    job.config.max_retries = 1;
    job.config.n_retries = 0;
    job.submit().unwrap();
    job.get_status(false, false).unwrap();

    assert_eq!(job.status(), Status::Success);
}
