// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use jg_core::test_support::StubBackend;
use jg_core::{Job, JobConfig, Status};
use std::sync::Arc;

#[test]
fn n_retries_never_exceeds_max_retries_across_repeated_failures() {
    let backend = Arc::new(StubBackend::default());
    backend.set_result(Status::Finished, "1");
    let config = JobConfig::builder("a", "/tmp/a.sh", "/tmp/a.log", backend).max_retries(2).build().unwrap();
    let mut job = Job::new(config);

    for _ in 0..5 {
        job.submit().unwrap();
        job.get_status(false, false).unwrap();
        assert!(job.config.n_retries <= job.config.max_retries);
        if job.status() != Status::Failed {
            break;
        }
        if !job.can_retry() {
            break;
        }
        job.retry(false, false, false, None).unwrap();
        assert!(job.config.n_retries <= job.config.max_retries);
    }

    assert_eq!(job.config.n_retries, job.config.max_retries, "retry budget should be fully spent");
    assert_eq!(job.status(), Status::Failed);
}
