// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Non-interactive renderer: one line per change, written to any `Write`.

use crate::summary::Summary;
use crate::Printer;
use jg_core::{JobContainer, Status};
use std::io::{self, Write};

/// Writes a summary line only when the tally has actually changed since the
/// last call — suitable for CI logs or any stdout that has been redirected
/// to a file, where a redrawing bar would just spam it with control codes.
pub struct PlainPrinter<W: Write = io::Stdout> {
    out: W,
    last: Option<Summary>,
}

impl PlainPrinter<io::Stdout> {
    pub fn new() -> Self {
        Self::to_writer(io::stdout())
    }
}

impl Default for PlainPrinter<io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> PlainPrinter<W> {
    pub fn to_writer(out: W) -> Self {
        Self { out, last: None }
    }

    fn line(summary: &Summary) -> String {
        format!(
            "{}/{} done — {} running, {} configured, {} success, {} failed, {} cancelled",
            summary.done(),
            summary.total,
            summary.count(Status::Running),
            summary.count(Status::Configured),
            summary.count(Status::Success),
            summary.count(Status::Failed),
            summary.count(Status::Cancelled),
        )
    }
}

impl<W: Write> Printer for PlainPrinter<W> {
    fn update(&mut self, container: &JobContainer) {
        let summary = Summary::from_container(container);
        if self.last.as_ref() == Some(&summary) {
            return;
        }
        let _ = writeln!(self.out, "{}", Self::line(&summary));
        self.last = Some(summary);
    }

    fn finish(&mut self, container: &JobContainer) {
        let summary = Summary::from_container(container);
        let _ = writeln!(self.out, "{}", Self::line(&summary));
    }
}

#[cfg(test)]
#[path = "plain_tests.rs"]
mod tests;
