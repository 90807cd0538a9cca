// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use jg_core::test_support::StubBackend;
use jg_core::{Job, JobConfig, PostAction, Status};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

#[test]
fn the_completion_hook_fires_exactly_once_per_terminal_entry() {
    let calls = Arc::new(AtomicU32::new(0));
    let counted = calls.clone();

    let backend = Arc::new(StubBackend::default());
    backend.set_result(Status::Finished, "1");
    let config = JobConfig::builder("a", "/tmp/a.sh", "/tmp/a.log", backend)
        .max_retries(2)
        .post_func(PostAction::custom(move |_config| {
            counted.fetch_add(1, Ordering::SeqCst);
        }))
        .build()
        .unwrap();
    let mut job = Job::new(config);

    let mut terminal_entries = 0;
    for _ in 0..3 {
        job.submit().unwrap();
        job.get_status(false, false).unwrap();
        assert_eq!(job.status(), Status::Failed);
        terminal_entries += 1;

        // Re-evaluating an already-terminal job must not re-fire the hook.
        job.get_status(false, false).unwrap();
        job.get_status(false, false).unwrap();

        if !job.can_retry() {
            break;
        }
        job.retry(false, false, false, None).unwrap();
    }

    assert_eq!(calls.load(Ordering::SeqCst), terminal_entries);
}
