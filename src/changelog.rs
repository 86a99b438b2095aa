//! Changelog parsing.
//!
//! A changelog is a list of entries, newest first. Each entry starts with a
//! `# Title` line and ends with a line holding only `##`:
//!
//! ```text
//! # Version 1.05
//!
//! Removed Google Maps Fragment
//! ##
//! # Version 1.04
//! ...
//! ```

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::{ReleaseError, Result};

/// Line that closes a changelog entry.
pub const ENTRY_TERMINATOR: &str = "##";

#[allow(clippy::unwrap_used)] // Static regex pattern is known to be valid
static VERSION_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[vV]?(\d+(?:\.\d+)*(?:-[0-9A-Za-z.]+)?)$").unwrap());

/// The most recent entry of a changelog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogEntry {
    /// Title line with the leading `#` removed.
    pub version_title: String,
    /// Body lines in file order, without surrounding blank lines.
    pub body: Vec<String>,
}

impl ChangelogEntry {
    /// Returns the body as a single newline-joined string.
    pub fn body_text(&self) -> String {
        self.body.join("\n")
    }

    /// Returns the first version-looking token of the title, without a `v` prefix.
    ///
    /// `"Version 1.05"` yields `Some("1.05")`.
    pub fn version(&self) -> Option<String> {
        self.version_title
            .split_whitespace()
            .map(|token| token.trim_matches(|c: char| c.is_ascii_punctuation()))
            .find_map(|token| VERSION_TOKEN.captures(token))
            .map(|caps| caps[1].to_string())
    }
}

/// Reads a changelog file and returns its most recent entry.
pub fn read_latest(path: &Path) -> Result<ChangelogEntry> {
    let text = std::fs::read_to_string(path).map_err(|e| ReleaseError::io(path, e))?;
    debug!(path = %path.display(), bytes = text.len(), "Read changelog");
    parse_latest(&text)
}

/// Extracts the first entry of a changelog.
///
/// Only file position decides which entry is the latest; the content of later
/// entries is never inspected.
pub fn parse_latest(text: &str) -> Result<ChangelogEntry> {
    if text.trim().is_empty() {
        return Err(ReleaseError::MalformedChangelog(
            "changelog is empty".to_string(),
        ));
    }

    let lines: Vec<&str> = text.lines().collect();
    let terminator = lines
        .iter()
        .position(|line| is_terminator(line))
        .ok_or_else(|| {
            ReleaseError::MalformedChangelog(format!(
                "no '{ENTRY_TERMINATOR}' line terminates the first entry"
            ))
        })?;

    let span = trim_blank_lines(&lines[..terminator]);
    let (title_line, body) = span.split_first().ok_or_else(|| {
        ReleaseError::MalformedChangelog("first entry has no title line".to_string())
    })?;

    let title = title_line
        .trim_start()
        .strip_prefix('#')
        .ok_or_else(|| {
            ReleaseError::MalformedChangelog(format!(
                "first entry must start with a '#' title line, found '{}'",
                title_line.trim()
            ))
        })?
        .trim();
    if title.is_empty() {
        return Err(ReleaseError::MalformedChangelog(
            "first entry has an empty title".to_string(),
        ));
    }

    let entry = ChangelogEntry {
        version_title: title.to_string(),
        body: trim_blank_lines(body)
            .iter()
            .map(|line| (*line).to_string())
            .collect(),
    };

    debug!(
        title = %entry.version_title,
        body_lines = entry.body.len(),
        "Extracted latest changelog entry"
    );

    Ok(entry)
}

fn is_terminator(line: &str) -> bool {
    line.trim() == ENTRY_TERMINATOR
}

fn trim_blank_lines<'a, 'b>(lines: &'b [&'a str]) -> &'b [&'a str] {
    let start = lines
        .iter()
        .position(|line| !line.trim().is_empty())
        .unwrap_or(lines.len());
    let end = lines
        .iter()
        .rposition(|line| !line.trim().is_empty())
        .map_or(start, |i| i + 1);
    &lines[start..end]
}
