// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::support::{run_until_done, scheduler_with, write_script};
use jg_backend::TestBackend;
use jg_core::{JobConfig, ListenerUpdate, Status};
use jg_engine::{Listener, MapProperty};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

fn output_listener(output_path: std::path::PathBuf) -> Listener {
    let poll_fn = Box::new(move || {
        let mut payload = HashMap::new();
        if output_path.is_file() {
            payload.insert(
                output_path.to_string_lossy().into_owned(),
                ListenerUpdate { status: Some(Status::Success), exitcode: Some("0:0".to_string()) },
            );
        }
        payload
    });
    Listener::spawn(
        poll_fn,
        Status::Finished,
        MapProperty::Output,
        Duration::from_millis(50),
        Some(5),
        ListenerUpdate { status: Some(Status::Failed), exitcode: Some("1".to_string()) },
    )
}

#[test]
fn a_job_watched_by_output_file_succeeds_once_the_file_appears() {
    let dir = tempdir().unwrap();
    let mut scheduler = scheduler_with(&dir, |s| s.local_max(1).listens(true));

    let output = dir.path().join("test");
    let script = dir.path().join("a.sh");
    write_script(&script, &format!("touch {} && sleep 1", output.display()));

    scheduler
        .add_job(
            JobConfig::builder("a", script, dir.path().join("a.log"), Arc::new(TestBackend::new()))
                .job_type(jg_core::Type::Local)
                .output(output.clone())
                .build()
                .unwrap(),
        )
        .unwrap();
    scheduler.register_listener(output_listener(output));

    assert!(run_until_done(&mut scheduler, Duration::from_secs(10)));
    assert_eq!(scheduler.container().job("a").unwrap().status(), Status::Success);
}

#[test]
fn a_job_watched_by_an_unreachable_output_file_fails_once_listener_attempts_are_exhausted() {
    let dir = tempdir().unwrap();
    let mut scheduler = scheduler_with(&dir, |s| s.local_max(1).listens(true).output_max_attempts(5));

    let unreachable = dir.path().join("no-such-subdir").join("test");
    let script = dir.path().join("a.sh");
    write_script(&script, "sleep 1");

    scheduler
        .add_job(
            JobConfig::builder("a", script, dir.path().join("a.log"), Arc::new(TestBackend::new()))
                .job_type(jg_core::Type::Local)
                .output(unreachable.clone())
                .build()
                .unwrap(),
        )
        .unwrap();
    scheduler.register_listener(output_listener(unreachable));

    assert!(run_until_done(&mut scheduler, Duration::from_secs(10)));
    assert_eq!(scheduler.container().job("a").unwrap().status(), Status::Failed);
}
