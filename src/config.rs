//! Validated run configuration.

use std::fmt;
use std::path::PathBuf;

use url::Url;

use crate::error::{ReleaseError, Result};

/// Everything one release run needs, already validated.
#[derive(Clone)]
pub struct ReleaseConfig {
    /// Directory holding the built package.
    pub release_dir: PathBuf,
    /// Application display name.
    pub app_name: String,
    /// Dropbox API access token.
    pub dropbox_token: String,
    /// Dropbox folder receiving the package.
    pub dropbox_folder: String,
    /// Changelog file, newest entry first.
    pub changelog_file: PathBuf,
    /// Email template file.
    pub template_file: PathBuf,
    /// Zapier webhook delivering the email.
    pub webhook: Url,
    /// Email recipients.
    pub recipients: Vec<String>,
}

impl fmt::Debug for ReleaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReleaseConfig")
            .field("release_dir", &self.release_dir)
            .field("app_name", &self.app_name)
            .field("dropbox_token", &"<redacted>")
            .field("dropbox_folder", &self.dropbox_folder)
            .field("changelog_file", &self.changelog_file)
            .field("template_file", &self.template_file)
            .field("webhook", &self.webhook.as_str())
            .field("recipients", &self.recipients)
            .finish()
    }
}

/// Splits a comma separated recipient list, dropping empty entries.
pub fn parse_recipients(csv: &str) -> Result<Vec<String>> {
    let recipients: Vec<String> = csv
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(ToString::to_string)
        .collect();

    if recipients.is_empty() {
        return Err(ReleaseError::Configuration(
            "--email.to must name at least one recipient".to_string(),
        ));
    }
    Ok(recipients)
}

/// Parses the webhook URL, accepting only absolute http(s) URLs.
pub fn parse_webhook(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ReleaseError::Configuration(format!("--zapier.hook '{raw}' is not a URL: {e}")))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(ReleaseError::Configuration(format!(
            "--zapier.hook must use http or https, got '{scheme}'"
        ))),
    }
}

/// Rejects blank values for a required option.
pub fn require_non_blank(flag: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ReleaseError::Configuration(format!("--{flag} must not be empty")));
    }
    Ok(trimmed.to_string())
}
