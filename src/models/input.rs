use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>?").expect("tag pattern is valid"));

/// Line-oriented user input: template regions in design mode, primer groups in
/// check mode.
///
/// Lines are deduplicated keeping the first occurrence, so the file handed to
/// the tools preserves the user's ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputList {
    lines: Vec<String>,
    detected: usize,
}

/// How many lines were submitted versus how many will be processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InputSummary {
    pub detected: usize,
    pub used: usize,
}

impl InputList {
    pub fn parse(raw: &str) -> Self {
        let cleaned = strip_slashes(&strip_tags(raw.trim()));

        let mut detected = 0;
        let mut seen = HashSet::new();
        let mut lines = Vec::new();
        for line in cleaned.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.trim().is_empty() {
                continue;
            }
            detected += 1;
            if seen.insert(line) {
                lines.push(line.to_string());
            }
        }

        Self { lines, detected }
    }

    /// Non-blank lines before deduplication.
    pub fn detected(&self) -> usize {
        self.detected
    }

    /// Unique lines that will be processed.
    pub fn used(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn summary(&self) -> InputSummary {
        InputSummary {
            detected: self.detected,
            used: self.used(),
        }
    }

    /// File contents for the tools: unique lines joined by newlines.
    pub fn contents(&self) -> String {
        self.lines.join("\n")
    }
}

/// Remove anything that looks like an HTML tag, including an unterminated one.
pub fn strip_tags(input: &str) -> String {
    TAG_PATTERN.replace_all(input, "").into_owned()
}

/// Undo backslash escaping: `\x` becomes `x` and a lone trailing `\` is dropped.
pub fn strip_slashes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}
