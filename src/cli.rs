//! CLI interface for release-notify.

use std::path::PathBuf;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;
use tracing::debug;

use crate::config::{self, ReleaseConfig};
use crate::error::ReleaseError;
use crate::notify::ZapierNotifier;
use crate::pipeline::ReleasePipeline;
use crate::storage::DropboxUploader;

/// release-notify: uploads a release package and mails its changelog.
#[derive(Parser, Debug)]
#[command(name = "release-notify")]
#[command(
    about = "Uploads a release package to Dropbox and emails the latest changelog entry",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    /// Directory containing the package file.
    #[arg(long = "release.dir", value_name = "PATH")]
    pub release_dir: PathBuf,

    /// Application display name.
    #[arg(long = "app.name", value_name = "NAME")]
    pub app_name: String,

    /// Dropbox API access token.
    #[arg(long = "dropbox.key", visible_alias = "dropbox.token", value_name = "TOKEN")]
    pub dropbox_key: String,

    /// Dropbox folder receiving the upload.
    #[arg(long = "dropbox.folder", value_name = "PATH")]
    pub dropbox_folder: String,

    /// Changelog file, newest entry first, entries closed by a `##` line.
    #[arg(long = "changelog.file", value_name = "PATH")]
    pub changelog_file: PathBuf,

    /// Email template with `#subject` and `#body` sections.
    #[arg(long = "template.file", value_name = "PATH")]
    pub template_file: PathBuf,

    /// Zapier webhook URL delivering the email.
    #[arg(long = "zapier.hook", value_name = "URL")]
    pub zapier_hook: String,

    /// Comma separated email recipients.
    #[arg(long = "email.to", value_name = "CSV")]
    pub email_to: String,
}

impl Cli {
    /// Validates the options into a [`ReleaseConfig`].
    pub fn into_config(self) -> Result<ReleaseConfig, ReleaseError> {
        Ok(ReleaseConfig {
            app_name: config::require_non_blank("app.name", &self.app_name)?,
            dropbox_token: config::require_non_blank("dropbox.key", &self.dropbox_key)?,
            dropbox_folder: config::require_non_blank("dropbox.folder", &self.dropbox_folder)?,
            webhook: config::parse_webhook(&self.zapier_hook)?,
            recipients: config::parse_recipients(&self.email_to)?,
            release_dir: self.release_dir,
            changelog_file: self.changelog_file,
            template_file: self.template_file,
        })
    }

    /// Returns the process exit code for an argument parsing failure.
    ///
    /// `--help` and `--version` succeed; every other parse error is a
    /// configuration error.
    pub fn parse_exit_code(err: &clap::Error) -> i32 {
        match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
            _ => ReleaseError::Configuration(err.to_string()).exit_code(),
        }
    }

    /// Executes one release run.
    pub async fn execute(self) -> Result<()> {
        let config = self.into_config()?;
        debug!(?config, "Starting release run");

        let uploader = DropboxUploader::new(config.dropbox_token.clone())?;
        let notifier = ZapierNotifier::new(config.webhook.clone())?;

        let summary = ReleasePipeline::new(&uploader, &notifier)
            .run(&config)
            .await?;

        println!(
            "Released {} {} to {} recipient(s): {}",
            config.app_name,
            summary.version,
            summary.recipients.len(),
            summary.download_url
        );
        Ok(())
    }
}
