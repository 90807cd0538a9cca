// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use jg_core::{Job, JobConfig, Status};

#[test]
fn a_fresh_container_reports_everything_configured() {
    let mut container = JobContainer::new();
    container.add(Job::new(JobConfig::for_test("a").build().unwrap())).unwrap();
    container.add(Job::new(JobConfig::for_test("b").build().unwrap())).unwrap();

    let summary = Summary::from_container(&container);

    assert_eq!(summary.total, 2);
    assert_eq!(summary.count(Status::Configured), 2);
    assert_eq!(summary.count(Status::Running), 0);
    assert_eq!(summary.done(), 0);
}

#[test]
fn done_counts_success_failed_and_cancelled_together() {
    let mut container = JobContainer::new();
    let mut a = Job::new(JobConfig::for_test("a").build().unwrap());
    a.submit().unwrap();
    a.apply_listener_update(Some(Status::Success), None);
    container.add(a).unwrap();

    let mut b = Job::new(JobConfig::for_test("b").build().unwrap());
    b.submit().unwrap();
    b.apply_listener_update(Some(Status::Failed), None);
    container.add(b).unwrap();

    container.add(Job::new(JobConfig::for_test("c").build().unwrap())).unwrap();

    let summary = Summary::from_container(&container);
    assert_eq!(summary.done(), 2);
    assert_eq!(summary.count(Status::Configured), 1);
}
