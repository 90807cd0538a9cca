// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! jg-parser: `@SLURMY.<key>` token substitution and status-label rewriting
//! (spec.md §4.8).
//!
//! Deliberately a small hand-rolled token-walker rather than a general
//! template engine (spec.md §9 design notes) — the only syntax recognised
//! is the literal `@SLURMY.` prefix followed by an identifier.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// One `@SLURMY.<key>` occurrence: its byte range in the source text and
/// the `<key>` it names (empty if the token has no following identifier).
struct Token {
    start: usize,
    end: usize,
    key: String,
}

const PREFIX: &str = "@SLURMY.";

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn find_tokens(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut search_from = 0;
    while let Some(rel) = text[search_from..].find(PREFIX) {
        let start = search_from + rel;
        let key_start = start + PREFIX.len();
        let key_end = text[key_start..]
            .find(|c: char| !is_key_char(c))
            .map(|i| key_start + i)
            .unwrap_or(text.len());
        tokens.push(Token { start, end: key_end, key: text[key_start..key_end].to_string() });
        search_from = key_end.max(start + 1);
    }
    tokens
}

/// Replace every `@SLURMY.<key>` in `text` with `attrs[key]`. Tokens whose
/// key is not present in `attrs` are left untouched and reported as a
/// warning (not an error — spec.md §4.8).
pub fn replace(text: &str, attrs: &HashMap<String, String>) -> (String, Vec<String>) {
    let mut result = String::with_capacity(text.len());
    let mut warnings = Vec::new();
    let mut last = 0;
    for token in find_tokens(text) {
        result.push_str(&text[last..token.start]);
        match attrs.get(&token.key) {
            Some(value) => result.push_str(value),
            None => {
                result.push_str(&text[token.start..token.end]);
                warnings.push(format!(
                    "unresolved token `@SLURMY.{}` (not a known config attribute)",
                    token.key
                ));
            }
        }
        last = token.end;
        tracing::debug!(key = %token.key, resolved = attrs.contains_key(&token.key), "@SLURMY token");
    }
    result.push_str(&text[last..]);
    for warning in &warnings {
        tracing::warn!("{warning}");
    }
    (result, warnings)
}

/// Which status-label marker `set_status_label` looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLabel {
    Finished,
    Success,
}

impl StatusLabel {
    fn token(self) -> &'static str {
        match self {
            StatusLabel::Finished => "FINISHED",
            StatusLabel::Success => "SUCCESS",
        }
    }
}

/// If `@SLURMY.FINISHED` (resp. `@SLURMY.SUCCESS`) appears in `text`,
/// replace every occurrence with `touch <tmp_dir>/<job_name>.<LABEL>` and
/// return the marker path the caller should synthesise a
/// `FinishedTrigger`/`SuccessTrigger` predicate from.
pub fn set_status_label(
    text: &str,
    job_name: &str,
    label: StatusLabel,
    tmp_dir: &Path,
) -> (String, Option<PathBuf>) {
    let needle = format!("@SLURMY.{}", label.token());
    if !text.contains(&needle) {
        return (text.to_string(), None);
    }
    let marker_path = tmp_dir.join(format!("{job_name}.{}", label.token()));
    let touch_cmd = format!("touch {}", marker_path.display());
    (text.replace(&needle, &touch_cmd), Some(marker_path))
}

/// Outcome of rewriting both status-label markers in one pass.
#[derive(Debug, Clone)]
pub struct MarkerRewrite {
    pub text: String,
    pub finished_marker: Option<PathBuf>,
    /// `None` either because no `@SLURMY.SUCCESS` marker was present, or
    /// because it was ignored in favour of a declared `output` path.
    pub success_marker: Option<PathBuf>,
    pub warnings: Vec<String>,
}

/// Rewrite both `@SLURMY.FINISHED` and `@SLURMY.SUCCESS` markers in one
/// pass. If `has_output` is true and a `@SLURMY.SUCCESS` marker is also
/// present, the marker's *script text* is still rewritten (the `touch`
/// command is harmless to leave behind) but `success_marker` comes back
/// `None` and a warning is recorded — per spec.md §4.8 and §9's open
/// question, the `output` path wins and the marker is not honoured as a
/// predicate source.
pub fn rewrite_markers(text: &str, job_name: &str, tmp_dir: &Path, has_output: bool) -> MarkerRewrite {
    let (text, finished_marker) = set_status_label(text, job_name, StatusLabel::Finished, tmp_dir);
    let (text, success_marker) = set_status_label(&text, job_name, StatusLabel::Success, tmp_dir);

    let mut warnings = Vec::new();
    let success_marker = if success_marker.is_some() && has_output {
        warnings.push(format!(
            "job `{job_name}`: @SLURMY.SUCCESS marker ignored in favour of its declared output path"
        ));
        None
    } else {
        success_marker
    };
    for warning in &warnings {
        tracing::warn!("{warning}");
    }
    MarkerRewrite { text, finished_marker, success_marker, warnings }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
