// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use jg_core::test_support::{strategies::arb_job_name, StubBackend};
use jg_core::{Job, JobConfig, JobContainer};
use proptest::prelude::*;
use std::sync::Arc;

#[test]
fn adding_the_same_name_twice_is_rejected_rather_than_silently_renamed() {
    let mut container = JobContainer::new();
    let job = |name: &str| {
        let backend = Arc::new(StubBackend::default());
        Job::new(JobConfig::builder(name, "/tmp/a.sh", "/tmp/a.log", backend).build().unwrap())
    };

    container.add(job("a")).unwrap();
    let err = container.add(job("a")).unwrap_err();
    assert!(matches!(err, jg_core::CoreError::DuplicateName(name) if name == "a"));
}

proptest! {
    /// For any sequence of distinct valid names submitted to `add_job`,
    /// every name that was accepted is still present and pairwise distinct
    /// from every other accepted name (spec.md §8 invariant 2).
    #[test]
    fn accepted_names_stay_pairwise_distinct_and_valid(names in prop::collection::vec(arb_job_name(), 0..20)) {
        let mut container = JobContainer::new();
        let mut accepted = Vec::new();
        for name in names {
            let backend = Arc::new(StubBackend::default());
            let config = JobConfig::builder(name.clone(), "/tmp/a.sh", "/tmp/a.log", backend).build().unwrap();
            if container.add(Job::new(config)).is_ok() {
                accepted.push(name);
            }
        }
        let mut sorted = accepted.clone();
        sorted.sort();
        sorted.dedup();
        prop_assert_eq!(sorted.len(), accepted.len());
        for name in &accepted {
            prop_assert!(jg_core::validate_name(name).is_ok());
        }
    }
}
