// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use jg_core::test_support::StubBackend;
use jg_core::{Job, JobConfig, Type};
use std::sync::Arc;

#[test]
fn a_job_that_has_ever_run_cannot_change_type() {
    let backend = Arc::new(StubBackend::default());
    let config = JobConfig::builder("a", "/tmp/a.sh", "/tmp/a.log", backend).build().unwrap();
    let mut job = Job::new(config);

    job.set_type(Type::Local).unwrap();
    assert_eq!(job.job_type(), Type::Local);

    job.submit().unwrap();
    let err = job.set_type(Type::Batch).unwrap_err();
    assert!(matches!(err, jg_core::CoreError::TypeChangeNotConfigured(_)));
    assert_eq!(job.job_type(), Type::Local);
}
