// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use jg_core::{JobConfig, JobContainer, Status};
use jg_core::test_support::StubBackend;
use std::sync::Arc;

#[test]
fn every_job_appears_in_exactly_one_status_bucket_after_every_transition() {
    let mut container = JobContainer::new();
    for name in ["a", "b", "c"] {
        let backend = Arc::new(StubBackend::default());
        let config = JobConfig::builder(name, format!("/tmp/{name}.sh"), format!("/tmp/{name}.log"), backend)
            .build()
            .unwrap();
        container.add(jg_core::Job::new(config)).unwrap();
    }
    container.assert_partition();

    container.job_mut("a").unwrap().submit().unwrap();
    container.reindex("a").unwrap();
    container.assert_partition();

    container.job_mut("b").unwrap().cancel(false).unwrap();
    container.reindex("b").unwrap();
    container.assert_partition();

    let total: usize =
        Status::ALL.iter().map(|s| container.count_in_status(*s)).sum();
    assert_eq!(total, container.len());
}
