// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::support::{run_until_done, scheduler_with, write_script};
use jg_backend::TestBackend;
use jg_core::{JobConfig, Status, Type};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn a_child_only_runs_once_both_tagged_parents_have_finished() {
    let dir = tempdir().unwrap();
    let mut scheduler = scheduler_with(&dir, |s| s.local_max(2));

    let p1 = dir.path().join("p1.sh");
    write_script(&p1, &format!("touch {}/out1 && sleep 2", dir.path().display()));
    let p2 = dir.path().join("p2.sh");
    write_script(&p2, &format!("touch {}/out2 && sleep 2", dir.path().display()));
    let c = dir.path().join("c.sh");
    write_script(&c, &format!("ls {}/out1 {}/out2", dir.path().display(), dir.path().display()));

    let backend = Arc::new(TestBackend::new());
    scheduler
        .add_job(
            JobConfig::builder("p1", p1, dir.path().join("p1.log"), backend.clone())
                .job_type(Type::Local)
                .tag("p1")
                .build()
                .unwrap(),
        )
        .unwrap();
    scheduler
        .add_job(
            JobConfig::builder("p2", p2, dir.path().join("p2.log"), backend.clone())
                .job_type(Type::Local)
                .tag("p2")
                .build()
                .unwrap(),
        )
        .unwrap();
    scheduler
        .add_job(
            JobConfig::builder("c", c, dir.path().join("c.log"), backend)
                .parent_tag("p1")
                .parent_tag("p2")
                .build()
                .unwrap(),
        )
        .unwrap();

    assert!(run_until_done(&mut scheduler, Duration::from_secs(10)), "session should complete before the timeout");

    let container = scheduler.container();
    assert_eq!(container.job("p1").unwrap().status(), Status::Success);
    assert_eq!(container.job("p2").unwrap().status(), Status::Success);
    assert_eq!(container.job("c").unwrap().status(), Status::Success);
}
