// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use jg_core::test_support::StubBackend;
use jg_core::{Job, JobConfig, Status};
use std::sync::Arc;

#[test]
fn a_terminal_job_does_not_drift_until_reset_or_retry_is_called() {
    let backend = Arc::new(StubBackend::default());
    backend.set_result(Status::Finished, "0:0");
    let config = JobConfig::builder("a", "/tmp/a.sh", "/tmp/a.log", backend).build().unwrap();
    let mut job = Job::new(config);

    job.submit().unwrap();
    job.get_status(false, false).unwrap();
    assert_eq!(job.status(), Status::Success);

    // Repeated evaluation of an already-terminal job is a no-op: `get_status`
    // only advances a job out of RUNNING/FINISHED, never out of a terminal
    // status on its own.
    for _ in 0..5 {
        job.get_status(false, false).unwrap();
        assert_eq!(job.status(), Status::Success);
    }

    job.reset(false);
    assert_eq!(job.status(), Status::Configured);
}
