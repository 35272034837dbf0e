//! Splitting extracted page text into reveal lines

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Failed to compile whitespace regex"));

/// How blank lines are treated when a page's text is split on newlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinePolicy {
    /// Trim every line, collapse inner whitespace, drop lines left empty
    #[default]
    SkipBlank,
    /// Keep every newline-separated segment as extracted
    KeepAll,
}

/// Split page text into lines according to `policy`.
///
/// `KeepAll` drops only the single empty segment that a terminating newline
/// leaves behind, so `"a\n\nb\n"` yields `["a", "", "b"]`.
pub fn split_lines(text: &str, policy: LinePolicy) -> Vec<String> {
    match policy {
        LinePolicy::SkipBlank => text
            .split('\n')
            .map(|line| WHITESPACE_RUN.replace_all(line.trim(), " ").into_owned())
            .filter(|line| !line.is_empty())
            .collect(),
        LinePolicy::KeepAll => {
            if text.is_empty() {
                return Vec::new();
            }
            let body = text.strip_suffix('\n').unwrap_or(text);
            body.split('\n')
                .map(|line| line.trim_end_matches('\r').to_string())
                .collect()
        }
    }
}
