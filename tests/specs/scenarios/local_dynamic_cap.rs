// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::support::{run_until_done, scheduler_with, write_script};
use jg_backend::TestBackend;
use jg_core::{JobConfig, Status, Type};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn exactly_one_job_is_retyped_local_when_capacity_only_covers_one() {
    let dir = tempdir().unwrap();
    let mut scheduler = scheduler_with(&dir, |s| s.local_max(1).local_dynamic(true));

    let a_script = dir.path().join("a.sh");
    write_script(&a_script, "exit 1");
    let b_script = dir.path().join("b.sh");
    write_script(&b_script, "exit 1");

    // Every BATCH resolution in this workspace goes through TestBackend, which
    // doesn't shell out; force its reported verdict to the `exit 1` the
    // script would really produce so the BATCH-typed job fails the same way
    // the LOCAL-typed one does by actually running its script.
    let batch_backend = Arc::new(TestBackend::new());
    batch_backend.force_result(Status::Finished, "1");
    scheduler
        .add_job(JobConfig::builder("a", a_script, dir.path().join("a.log"), batch_backend).build().unwrap())
        .unwrap();
    scheduler
        .add_job(
            JobConfig::builder("b", b_script, dir.path().join("b.log"), Arc::new(TestBackend::new()))
                .build()
                .unwrap(),
        )
        .unwrap();

    scheduler.submit_jobs(false).unwrap();

    let container = scheduler.container();
    let a_type = container.job("a").unwrap().job_type();
    let b_type = container.job("b").unwrap().job_type();
    let local_count = [a_type, b_type].iter().filter(|t| **t == Type::Local).count();
    assert_eq!(local_count, 1, "exactly one job should have been retyped LOCAL");
    assert_eq!(container.local_count(), 1);

    assert!(run_until_done(&mut scheduler, Duration::from_secs(10)), "session should complete before the timeout");

    let container = scheduler.container();
    assert_eq!(container.job("a").unwrap().status(), Status::Failed);
    assert_eq!(container.job("b").unwrap().status(), Status::Failed);
    // Retyping is a one-time submission-time decision, not a standing
    // property: re-running submission after both are terminal must not
    // touch either job's type again.
    let a_type_before = container.job("a").unwrap().job_type();
    let b_type_before = container.job("b").unwrap().job_type();

    scheduler.submit_jobs(false).unwrap();
    let container = scheduler.container();
    assert_eq!(container.job("a").unwrap().job_type(), a_type_before);
    assert_eq!(container.job("b").unwrap().job_type(), b_type_before);
}
