// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::support::write_script;
use jg_backend::TestBackend;
use jg_core::{Job, JobConfig, Status};
use std::sync::Arc;
use tempfile::tempdir;

#[test]
fn resetting_a_succeeded_job_clears_its_job_id_and_a_rerun_assigns_a_fresh_one() {
    let dir = tempdir().unwrap();
    let script = dir.path().join("a.sh");
    write_script(&script, "echo test");

    let config = JobConfig::builder("a", script, dir.path().join("a.log"), Arc::new(TestBackend::new()))
        .build()
        .unwrap();
    let mut job = Job::new(config);

    job.submit().unwrap();
    job.get_status(false, false).unwrap();
    assert_eq!(job.status(), Status::Success);
    let id1 = job.job_id().unwrap().to_string();

    job.reset(false);
    assert_eq!(job.status(), Status::Configured);
    assert!(job.job_id().is_none());

    job.submit().unwrap();
    job.get_status(false, false).unwrap();
    let id2 = job.job_id().unwrap().to_string();

    assert_ne!(id1, id2);
    assert_eq!(job.status(), Status::Success);
}
