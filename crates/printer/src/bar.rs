// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interactive renderer: a single redrawing `indicatif` bar.

use crate::summary::Summary;
use crate::Printer;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use jg_core::{JobContainer, Status};

const TEMPLATE: &str = "[{elapsed_precise}] {bar:40.cyan/blue} {msg} {pos}/{len}";

/// Wraps one `indicatif::ProgressBar` whose length and position track
/// `Summary::total`/`Summary::done`, with the running/failed counts colored
/// in the message segment.
pub struct BarPrinter {
    bar: ProgressBar,
}

impl BarPrinter {
    pub fn new() -> Self {
        Self::with_bar(ProgressBar::new(0))
    }

    /// Build around a caller-supplied bar, e.g. `ProgressBar::hidden()` in
    /// tests so nothing is drawn to a terminal.
    pub fn with_bar(bar: ProgressBar) -> Self {
        let style = ProgressStyle::with_template(TEMPLATE).unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        Self { bar }
    }

    fn message(summary: &Summary) -> String {
        format!(
            "{} running, {} failed",
            summary.count(Status::Running).to_string().cyan(),
            summary.count(Status::Failed).to_string().red(),
        )
    }
}

impl Default for BarPrinter {
    fn default() -> Self {
        Self::new()
    }
}

impl Printer for BarPrinter {
    fn update(&mut self, container: &JobContainer) {
        let summary = Summary::from_container(container);
        self.bar.set_length(summary.total as u64);
        self.bar.set_position(summary.done() as u64);
        self.bar.set_message(Self::message(&summary));
    }

    fn finish(&mut self, container: &JobContainer) {
        let summary = Summary::from_container(container);
        self.bar.set_length(summary.total as u64);
        self.bar.set_position(summary.done() as u64);
        self.bar.finish_with_message(format!(
            "{} success, {} failed, {} cancelled",
            summary.count(Status::Success).to_string().green(),
            summary.count(Status::Failed).to_string().red(),
            summary.count(Status::Cancelled).to_string().yellow(),
        ));
    }
}

#[cfg(test)]
#[path = "bar_tests.rs"]
mod tests;
