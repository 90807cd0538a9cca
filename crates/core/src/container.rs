// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `JobContainer` — the in-memory registry of a session's jobs.
//!
//! Owns every [`Job`] and keeps four indices over them in sync: by name
//! (the primary store), by [`Status`] bucket, by tag, and by backend id.
//! `states` partitions the job set exactly (every job appears in precisely
//! one bucket) — that partition invariant is what `reindex` exists to
//! maintain whenever a job's status changes.

use crate::error::{CoreError, CoreResult};
use crate::job::Job;
use crate::status::{Status, Type};
use std::collections::{HashMap, HashSet};

/// In-memory registry of a session's jobs, indexed by name, backend-id,
/// tag, and status.
#[derive(Default)]
pub struct JobContainer {
    jobs: HashMap<String, Job>,
    /// Declaration order; submission and iteration follow this, not the
    /// arbitrary order of `jobs`.
    order: Vec<String>,
    states: HashMap<Status, HashSet<String>>,
    tags: HashMap<String, HashSet<String>>,
    /// Names of LOCAL-typed jobs currently occupying a `local_max` slot —
    /// i.e. submitted but not yet terminal. Kept in sync by `reindex` and
    /// `update_tags`, never touched directly by callers outside this type
    /// except via [`JobContainer::mark_local`].
    local: HashSet<String>,
    ids: HashMap<String, String>,
}

impl JobContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Insert a new job. Fails if its name is already registered.
    pub fn add(&mut self, job: Job) -> CoreResult<()> {
        let name = job.name().to_string();
        if self.jobs.contains_key(&name) {
            return Err(CoreError::DuplicateName(name));
        }
        for tag in job.tags() {
            self.tags.entry(tag.clone()).or_default().insert(name.clone());
        }
        self.states.entry(job.status()).or_default().insert(name.clone());
        if job.job_type() == Type::Local && !job.status().is_terminal() {
            self.local.insert(name.clone());
        }
        self.order.push(name.clone());
        self.jobs.insert(name, job);
        Ok(())
    }

    /// Register the backend-assigned id for `name`, so a Listener (which
    /// only sees ids) can be mapped back to a job.
    pub fn add_id(&mut self, backend_id: impl Into<String>, name: &str) -> CoreResult<()> {
        let backend_id = backend_id.into();
        if let Some(existing) = self.ids.get(&backend_id) {
            if existing != name {
                return Err(CoreError::DuplicateBackendId(backend_id, existing.clone()));
            }
            return Ok(());
        }
        self.ids.insert(backend_id, name.to_string());
        Ok(())
    }

    pub fn name_for_id(&self, backend_id: &str) -> Option<&str> {
        self.ids.get(backend_id).map(String::as_str)
    }

    pub fn job(&self, name: &str) -> CoreResult<&Job> {
        self.jobs.get(name).ok_or_else(|| CoreError::UnknownJob(name.to_string()))
    }

    pub fn job_mut(&mut self, name: &str) -> CoreResult<&mut Job> {
        self.jobs.get_mut(name).ok_or_else(|| CoreError::UnknownJob(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.jobs.contains_key(name)
    }

    /// Declaration order — the order `add` was called in, which is the
    /// order the scheduler's submission loop walks.
    pub fn names_in_order(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn names_in_status(&self, status: Status) -> &HashSet<String> {
        static EMPTY: std::sync::OnceLock<HashSet<String>> = std::sync::OnceLock::new();
        self.states.get(&status).unwrap_or_else(|| EMPTY.get_or_init(HashSet::new))
    }

    pub fn count_in_status(&self, status: Status) -> usize {
        self.names_in_status(status).len()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.get(tag).is_some_and(|names| !names.is_empty())
    }

    pub fn names_with_tag(&self, tag: &str) -> impl Iterator<Item = &str> {
        self.tags.get(tag).into_iter().flat_map(|names| names.iter().map(String::as_str))
    }

    /// Jobs matching both filters: `tags` is a union (any tag matches),
    /// `states` is a union (any state matches); omitted filters match
    /// everything. Returned in declaration order.
    pub fn get(&self, tags: Option<&HashSet<String>>, states: Option<&HashSet<Status>>) -> Vec<&Job> {
        self.order
            .iter()
            .filter_map(|name| self.jobs.get(name))
            .filter(|job| tags.map_or(true, |tags| job.has_tags(tags)))
            .filter(|job| states.map_or(true, |states| states.contains(&job.status())))
            .collect()
    }

    /// Number of LOCAL-typed jobs currently occupying a `local_max` slot.
    pub fn local_count(&self) -> usize {
        self.local.len()
    }

    /// Mark a job as now occupying a LOCAL slot. Called by the scheduler
    /// right before submitting a job typed (or retyped) LOCAL.
    pub fn mark_local(&mut self, name: &str) {
        self.local.insert(name.to_string());
    }

    /// The only path through which a job changes state bucket: removes the
    /// name from every bucket, then reinserts under its *current* status
    /// (read fresh from the job). Also drops terminal jobs from the LOCAL
    /// slot-occupancy set. Call after mutating a job's status in place.
    pub fn reindex(&mut self, name: &str) -> CoreResult<()> {
        let (status, is_local) = {
            let job = self.job(name)?;
            (job.status(), job.job_type() == Type::Local)
        };
        for bucket in self.states.values_mut() {
            bucket.remove(name);
        }
        self.states.entry(status).or_default().insert(name.to_string());
        if is_local && !status.is_terminal() {
            self.local.insert(name.to_string());
        } else {
            self.local.remove(name);
        }
        Ok(())
    }

    /// Re-sync the tag and LOCAL-slot indices after a job's type or tags
    /// changed dynamically (e.g. `local_dynamic` retyping).
    pub fn update_tags(&mut self, name: &str) -> CoreResult<()> {
        let job = self.job(name)?;
        let job_type = job.job_type();
        let status = job.status();
        let tags: HashSet<String> = job.tags().clone();
        for bucket in self.tags.values_mut() {
            bucket.remove(name);
        }
        for tag in &tags {
            self.tags.entry(tag.clone()).or_default().insert(name.to_string());
        }
        if job_type == Type::Local && !status.is_terminal() {
            self.local.insert(name.to_string());
        } else {
            self.local.remove(name);
        }
        Ok(())
    }

    /// True iff every job has reached a terminal status.
    pub fn all_terminal(&self) -> bool {
        self.count_in_status(Status::Success)
            + self.count_in_status(Status::Failed)
            + self.count_in_status(Status::Cancelled)
            == self.jobs.len()
    }

    /// Asserts the partition invariant: every job appears in exactly one
    /// status bucket. Used by tests and debug assertions, not the hot path.
    pub fn assert_partition(&self) {
        let total: usize = Status::ALL.iter().map(|s| self.count_in_status(*s)).sum();
        debug_assert_eq!(total, self.jobs.len(), "job status buckets do not partition the job set");
    }
}

#[cfg(test)]
#[path = "container_tests.rs"]
mod tests;
