// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::support::{scheduler_with, write_script};
use jg_backend::TestBackend;
use jg_core::{JobConfig, Status, Type};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn run_max_keeps_at_most_one_job_running_at_a_time() {
    let dir = tempdir().unwrap();
    let mut scheduler = scheduler_with(&dir, |s| s.local_max(3).run_max(1));

    for name in ["a", "b", "c"] {
        let script = dir.path().join(format!("{name}.sh"));
        write_script(&script, "sleep 0.2");
        scheduler
            .add_job(
                JobConfig::builder(name, script, dir.path().join(format!("{name}.log")), Arc::new(TestBackend::new()))
                    .job_type(Type::Local)
                    .build()
                    .unwrap(),
            )
            .unwrap();
    }

    let mut max_running_observed = 0;
    let done = run_until_done_observing(&mut scheduler, Duration::from_secs(10), &mut max_running_observed);

    assert!(done, "session should complete before the timeout");
    assert!(max_running_observed <= 1, "run_max=1 must never allow more than one RUNNING job at once");
    for name in ["a", "b", "c"] {
        assert_eq!(scheduler.container().job(name).unwrap().status(), Status::Success);
    }
}

/// Like [`run_until_done`] but also records the highest `RUNNING` count seen
/// across every tick, so the caller can assert the concurrency cap held
/// throughout the run and not just at its end.
fn run_until_done_observing(
    scheduler: &mut jg_engine::Scheduler,
    timeout: Duration,
    max_running: &mut usize,
) -> bool {
    let start = std::time::Instant::now();
    loop {
        scheduler.tick(false).unwrap();
        *max_running = (*max_running).max(scheduler.container().count_in_status(Status::Running));
        if scheduler.is_done() {
            return true;
        }
        if start.elapsed() >= timeout {
            return false;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}
