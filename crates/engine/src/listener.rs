// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background pollers that feed [`jg_core::ListenerUpdate`] payloads back
//! into a [`JobContainer`] for PASSIVE-mode jobs (spec.md §4.6).
//!
//! A Listener owns exactly one background thread and a single-slot queue:
//! the poller overwrites on backpressure rather than buffering, so the
//! drain step only ever sees the latest snapshot the poller produced.

use crate::error::EngineResult;
use jg_core::{JobContainer, ListenFn, ListenerUpdate, Mode, Status};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Which job attribute a Listener's payload keys correspond to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapProperty {
    /// Payload keys are backend ids (`job.job_id()`).
    Id,
    /// Payload keys are output-file paths (`job.output()`).
    Output,
}

/// A running background poller plus the bookkeeping the scheduler's drain
/// step needs: which status it watches, how payload keys map to jobs, and
/// an optional exhausted-attempts verdict.
pub struct Listener {
    target_status: Status,
    map_property: MapProperty,
    max_attempts: Option<u32>,
    fail_results: ListenerUpdate,
    queue: Arc<Mutex<Option<HashMap<String, ListenerUpdate>>>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    /// Consecutive ticks, per job name, where the payload carried no entry
    /// for that job's key. Reset on any hit; consulted against
    /// `max_attempts`.
    misses: HashMap<String, u32>,
}

impl Listener {
    /// Spawn a background thread calling `poll_fn` every `poll_interval`,
    /// publishing each result into a single-slot queue that overwrites its
    /// predecessor rather than buffering.
    pub fn spawn(
        mut poll_fn: ListenFn,
        target_status: Status,
        map_property: MapProperty,
        poll_interval: Duration,
        max_attempts: Option<u32>,
        fail_results: ListenerUpdate,
    ) -> Self {
        let queue = Arc::new(Mutex::new(None));
        let stop = Arc::new(AtomicBool::new(false));
        let queue_thread = Arc::clone(&queue);
        let stop_thread = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            while !stop_thread.load(Ordering::Relaxed) {
                let payload = poll_fn();
                *queue_thread.lock() = Some(payload);
                thread::sleep(poll_interval);
            }
        });
        Listener {
            target_status,
            map_property,
            max_attempts,
            fail_results,
            queue,
            stop,
            handle: Some(handle),
            misses: HashMap::new(),
        }
    }

    fn take_latest(&self) -> Option<HashMap<String, ListenerUpdate>> {
        self.queue.lock().take()
    }

    /// Apply this listener's latest payload to every job in its target
    /// status and PASSIVE mode. Jobs in ACTIVE mode for that status are
    /// left alone: they evaluate their own transition.
    pub fn drain(&mut self, container: &mut JobContainer) -> EngineResult<()> {
        let payload = self.take_latest();
        let names: Vec<String> = container.names_in_status(self.target_status).iter().cloned().collect();

        for name in names {
            let (mode, key) = {
                let job = container.job(&name)?;
                let mode = job.get_mode(self.target_status);
                let key = match self.map_property {
                    MapProperty::Id => job.job_id().map(str::to_string),
                    MapProperty::Output => job.output().map(|p| p.to_string_lossy().into_owned()),
                };
                (mode, key)
            };
            if mode == Mode::Active {
                continue;
            }

            let hit = key.as_deref().and_then(|k| payload.as_ref().and_then(|p| p.get(k))).cloned();
            match hit {
                Some(update) => {
                    self.misses.remove(&name);
                    container.job_mut(&name)?.apply_listener_update(update.status, update.exitcode);
                    container.reindex(&name)?;
                }
                None => self.record_miss(container, &name)?,
            }
        }
        Ok(())
    }

    fn record_miss(&mut self, container: &mut JobContainer, name: &str) -> EngineResult<()> {
        let Some(max_attempts) = self.max_attempts else {
            return Ok(());
        };
        let count = self.misses.entry(name.to_string()).or_insert(0);
        *count += 1;
        if *count >= max_attempts {
            self.misses.remove(name);
            let fail = self.fail_results.clone();
            container.job_mut(name)?.apply_listener_update(fail.status, fail.exitcode);
            container.reindex(name)?;
        }
        Ok(())
    }

    /// Signal the background thread to stop and join it. Any unread
    /// payload is dropped.
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("target_status", &self.target_status)
            .field("map_property", &self.map_property)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
