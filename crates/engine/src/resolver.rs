// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `DependencyResolver` — readiness checking and cascade-cancel (spec.md
//! §4.4). Kept as free functions over a [`JobContainer`] rather than a
//! struct with its own state: the resolver has none, it only reads and
//! occasionally mutates the container it's handed.

use crate::error::{EngineError, EngineResult};
use jg_core::status::{Status, Type};
use jg_core::JobContainer;
use std::collections::HashSet;

/// True iff `name` may be submitted right now.
///
/// Evaluates, in order: the `starttime` gate, parent-tag existence, every
/// matched parent's verdict (cascading a cancellation onto `name` if a
/// parent has terminally failed with no retry budget left), and the
/// `local_max` concurrency gate for LOCAL jobs. The cascade-cancel is the
/// resolver's only side effect — everything else is a pure read.
pub fn is_ready(container: &mut JobContainer, name: &str, now_ms: u64, local_max: u32) -> EngineResult<bool> {
    let (starttime, parent_tags, job_type) = {
        let job = container.job(name)?;
        (job.starttime(), job.parent_tags().clone(), job.job_type())
    };

    if let Some(start) = starttime {
        if start > now_ms {
            return Ok(false);
        }
    }

    let mut parent_names: HashSet<String> = HashSet::new();
    for tag in &parent_tags {
        if !container.has_tag(tag) {
            return Err(EngineError::UnknownParentTag { job: name.to_string(), tag: tag.clone() });
        }
        parent_names.extend(container.names_with_tag(tag).map(str::to_string));
    }
    parent_names.remove(name);

    let mut all_succeeded = true;
    for parent_name in &parent_names {
        let (status, can_retry) = {
            let parent = container.job(parent_name)?;
            (parent.status(), parent.can_retry())
        };
        if status == Status::Success {
            continue;
        }
        all_succeeded = false;
        if matches!(status, Status::Failed | Status::Cancelled) && !can_retry {
            let dependent = container.job_mut(name)?;
            dependent.cancel(true)?;
            container.reindex(name)?;
            return Ok(false);
        }
    }
    if !all_succeeded {
        return Ok(false);
    }

    if job_type == Type::Local && container.local_count() >= local_max as usize {
        return Ok(false);
    }

    Ok(true)
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
