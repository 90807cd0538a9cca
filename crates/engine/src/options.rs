// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Global defaults threaded explicitly through `Scheduler`/`Backend`
//! construction, per spec.md §9's design note against a process-wide
//! static.

use std::collections::HashMap;
use std::path::PathBuf;

/// Session-independent defaults and the `test_mode`/`interactive_mode`
/// flags every backend adapter consults before shelling out.
#[derive(Debug, Clone)]
pub struct Options {
    pub work_dir: PathBuf,
    pub default_backend: String,
    /// Per-backend-kind prelude template applied around a job's command in
    /// `Backend::write_script`; `{command}` is substituted with the job's
    /// actual invocation (grounded in `original_source/slurmy/tools/options.py`'s
    /// `command_wrapper` dict — see SPEC_FULL.md "Supplemented features").
    pub command_wrapper: HashMap<String, String>,
    /// Disables real submissions; backends should resolve jobs
    /// deterministically instead (spec.md §7 "Backend-unavailable").
    pub test_mode: bool,
    /// Whether a human is present to be prompted before falling back to
    /// `test_mode` when a required backend executable is missing.
    pub interactive_mode: bool,
}

impl Options {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            default_backend: "test".to_string(),
            command_wrapper: HashMap::new(),
            test_mode: false,
            interactive_mode: false,
        }
    }

    pub fn test_mode(mut self, value: bool) -> Self {
        self.test_mode = value;
        self
    }

    pub fn interactive_mode(mut self, value: bool) -> Self {
        self.interactive_mode = value;
        self
    }

    pub fn default_backend(mut self, value: impl Into<String>) -> Self {
        self.default_backend = value.into();
        self
    }

    pub fn with_wrapper(mut self, backend_kind: impl Into<String>, template: impl Into<String>) -> Self {
        self.command_wrapper.insert(backend_kind.into(), template.into());
        self
    }

    /// Apply the configured wrapper prelude (if any) for `backend_kind`
    /// around `command`. A template without a literal `{command}` token is
    /// used verbatim as a prelude followed by the command on its own line.
    pub fn wrap_command(&self, backend_kind: &str, command: &str) -> String {
        match self.command_wrapper.get(backend_kind) {
            Some(template) if template.contains("{command}") => template.replace("{command}", command),
            Some(template) => format!("{template}\n{command}"),
            None => command.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "options_tests.rs"]
mod tests;
