//! Email template parsing and placeholder substitution.
//!
//! A template holds a `#subject` section followed by a `#body` section, each
//! marker on its own line. Placeholders are `{name}` tokens; see
//! [`Placeholder`] for the recognised names.

use std::path::Path;

use tracing::debug;

use crate::error::{ReleaseError, Result};

const SUBJECT_MARKER: &str = "#subject";
const BODY_MARKER: &str = "#body";

/// Placeholders a template may reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placeholder {
    /// `{app_name}`
    AppName,
    /// `{app_version}`
    AppVersion,
    /// `{app_download_url}`
    AppDownloadUrl,
    /// `{change_log}`
    ChangeLog,
}

impl Placeholder {
    /// All recognised placeholders.
    pub const ALL: [Self; 4] = [
        Self::AppName,
        Self::AppVersion,
        Self::AppDownloadUrl,
        Self::ChangeLog,
    ];

    /// Returns the name used between the braces.
    pub fn name(self) -> &'static str {
        match self {
            Self::AppName => "app_name",
            Self::AppVersion => "app_version",
            Self::AppDownloadUrl => "app_download_url",
            Self::ChangeLog => "change_log",
        }
    }

    /// Looks up a placeholder by its name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

/// Values substituted into a template.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReleaseContext {
    /// Application display name.
    pub app_name: String,
    /// Released version.
    pub app_version: String,
    /// Public download link of the uploaded package.
    pub download_url: String,
    /// Body of the latest changelog entry.
    pub changelog_text: String,
}

impl ReleaseContext {
    /// Returns the value bound to a placeholder.
    pub fn value(&self, placeholder: Placeholder) -> &str {
        match placeholder {
            Placeholder::AppName => &self.app_name,
            Placeholder::AppVersion => &self.app_version,
            Placeholder::AppDownloadUrl => &self.download_url,
            Placeholder::ChangeLog => &self.changelog_text,
        }
    }
}

/// A parsed template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailTemplate {
    /// Subject pattern, trimmed.
    pub subject_pattern: String,
    /// Body pattern, everything after the `#body` marker.
    pub body_pattern: String,
}

/// A template with every known placeholder filled in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedEmail {
    /// Email subject.
    pub subject: String,
    /// Email body.
    pub body: String,
}

impl EmailTemplate {
    /// Reads and parses a template file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ReleaseError::io(path, e))?;
        debug!(path = %path.display(), bytes = text.len(), "Read email template");
        Self::parse(&text)
    }

    /// Splits template text into its subject and body patterns.
    ///
    /// Lines before `#subject` are ignored. Trailing whitespace of the body is
    /// dropped so the final newline of the file does not end up in the email.
    pub fn parse(text: &str) -> Result<Self> {
        let lines: Vec<&str> = text.lines().collect();

        let subject_at = find_marker(&lines, SUBJECT_MARKER)?;
        let body_at = find_marker(&lines, BODY_MARKER)?;
        if body_at < subject_at {
            return Err(ReleaseError::MalformedTemplate(format!(
                "'{BODY_MARKER}' must come after '{SUBJECT_MARKER}'"
            )));
        }

        let subject_pattern = lines[subject_at + 1..body_at].join("\n").trim().to_string();
        let body_pattern = lines[body_at + 1..].join("\n").trim_end().to_string();

        Ok(Self {
            subject_pattern,
            body_pattern,
        })
    }

    /// Fills the subject and body patterns from the context.
    pub fn render(&self, context: &ReleaseContext) -> RenderedEmail {
        RenderedEmail {
            subject: substitute(&self.subject_pattern, context),
            body: substitute(&self.body_pattern, context),
        }
    }
}

fn find_marker(lines: &[&str], marker: &str) -> Result<usize> {
    let mut found = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.trim() == marker)
        .map(|(i, _)| i);

    match (found.next(), found.next()) {
        (Some(index), None) => Ok(index),
        (None, _) => Err(ReleaseError::MalformedTemplate(format!(
            "missing '{marker}' marker line"
        ))),
        (Some(_), Some(_)) => Err(ReleaseError::MalformedTemplate(format!(
            "'{marker}' marker appears more than once"
        ))),
    }
}

/// Replaces every known `{name}` token in a single left-to-right pass.
///
/// Unknown tokens and stray braces are copied verbatim. Substituted values are
/// never rescanned, so a changelog mentioning `{app_name}` stays literal.
pub fn substitute(pattern: &str, context: &ReleaseContext) -> String {
    let mut output = String::with_capacity(pattern.len());
    let mut rest = pattern;

    while let Some(open) = rest.find('{') {
        output.push_str(&rest[..open]);
        let candidate = &rest[open + 1..];

        let known = candidate.find('}').and_then(|close| {
            Placeholder::from_name(&candidate[..close]).map(|p| (p, close))
        });

        match known {
            Some((placeholder, close)) => {
                output.push_str(context.value(placeholder));
                rest = &candidate[close + 1..];
            }
            None => {
                output.push('{');
                rest = candidate;
            }
        }
    }

    output.push_str(rest);
    output
}
