// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A point-in-time tally of job counts by status.

use jg_core::{JobContainer, Status};
use std::collections::HashMap;

/// Cheap to rebuild every tick; comparing two summaries is how
/// [`crate::plain::PlainPrinter`] decides whether anything changed since
/// its last line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    counts: HashMap<Status, usize>,
}

impl Summary {
    pub fn from_container(container: &JobContainer) -> Self {
        let counts = Status::ALL.iter().map(|s| (*s, container.count_in_status(*s))).collect();
        Self { total: container.len(), counts }
    }

    pub fn count(&self, status: Status) -> usize {
        self.counts.get(&status).copied().unwrap_or(0)
    }

    /// SUCCESS + FAILED + CANCELLED — the scheduler's own loop-termination
    /// condition, mirrored here for the bar's position.
    pub fn done(&self) -> usize {
        self.count(Status::Success) + self.count(Status::Failed) + self.count(Status::Cancelled)
    }
}

#[cfg(test)]
#[path = "summary_tests.rs"]
mod tests;
