// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::support::{run_until_done, scheduler_with, write_script};
use jg_backend::TestBackend;
use jg_core::{JobConfig, Status};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn a_child_is_cancelled_with_its_retry_budget_cleared_when_its_parent_fails() {
    let dir = tempdir().unwrap();
    let mut scheduler = scheduler_with(&dir, |s| s);

    let parent_script = dir.path().join("parent.sh");
    write_script(&parent_script, "exit 1");
    let child_script = dir.path().join("child.sh");
    write_script(&child_script, "echo ok");

    let parent_backend = Arc::new(TestBackend::new());
    parent_backend.force_result(Status::Finished, "1");
    scheduler
        .add_job(
            JobConfig::builder("parent", parent_script, dir.path().join("parent.log"), parent_backend)
                .tag("p")
                .max_retries(0)
                .build()
                .unwrap(),
        )
        .unwrap();
    scheduler
        .add_job(
            JobConfig::builder("child", child_script, dir.path().join("child.log"), Arc::new(TestBackend::new()))
                .parent_tag("p")
                .max_retries(3)
                .build()
                .unwrap(),
        )
        .unwrap();

    assert!(run_until_done(&mut scheduler, Duration::from_secs(10)), "session should complete before the timeout");

    let container = scheduler.container();
    assert_eq!(container.job("parent").unwrap().status(), Status::Failed);
    let child = container.job("child").unwrap();
    assert_eq!(child.status(), Status::Cancelled);
    assert_eq!(child.config.max_retries, 0, "cascade-cancel clears the child's retry budget");
}
