//! The release run: locate, upload, parse changelog, render, notify.

use std::path::PathBuf;

use tracing::info;

use crate::artifact::{self, BuildMetadata, ARTIFACT_PATTERN};
use crate::changelog::{self, ChangelogEntry};
use crate::config::ReleaseConfig;
use crate::error::{ReleaseError, Result};
use crate::notify::Notifier;
use crate::storage::StorageUploader;
use crate::template::{EmailTemplate, ReleaseContext};

/// Outcome of a successful run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReleaseSummary {
    /// Local package that was uploaded.
    pub artifact: PathBuf,
    /// Storage path of the upload.
    pub remote_path: String,
    /// Public download link.
    pub download_url: String,
    /// Released version.
    pub version: String,
    /// Subject of the email that was sent.
    pub subject: String,
    /// Recipients of the email.
    pub recipients: Vec<String>,
}

/// Package chosen for upload, with the version when the build recorded one.
struct LocatedPackage {
    path: PathBuf,
    remote_name: String,
    version: Option<String>,
}

/// Runs the release stages in order against the given collaborators.
///
/// The first failing stage aborts the run. Nothing is rolled back: an upload
/// that succeeded stays in place when a later stage fails.
pub struct ReleasePipeline<'a> {
    uploader: &'a dyn StorageUploader,
    notifier: &'a dyn Notifier,
}

impl<'a> ReleasePipeline<'a> {
    /// Creates a pipeline using the given uploader and notifier.
    pub fn new(uploader: &'a dyn StorageUploader, notifier: &'a dyn Notifier) -> Self {
        Self { uploader, notifier }
    }

    /// Executes one release run.
    pub async fn run(&self, config: &ReleaseConfig) -> Result<ReleaseSummary> {
        let package = locate_package(config)?;

        let uploaded = self
            .uploader
            .upload(&package.path, &config.dropbox_folder, &package.remote_name)
            .await?;
        info!(
            remote_path = %uploaded.remote_path,
            url = %uploaded.download_url,
            "Uploaded release package"
        );

        let entry = changelog::read_latest(&config.changelog_file)?;
        let version = match package.version {
            Some(version) => version,
            None => version_from_entry(&entry)?,
        };
        info!(title = %entry.version_title, version = %version, "Parsed latest changelog entry");

        let context = ReleaseContext {
            app_name: config.app_name.clone(),
            app_version: version.clone(),
            download_url: uploaded.download_url.clone(),
            changelog_text: entry.body_text(),
        };
        let email = EmailTemplate::load(&config.template_file)?.render(&context);
        info!(subject = %email.subject, "Rendered release email");

        self.notifier.notify(&config.recipients, &email).await?;
        info!(recipients = config.recipients.len(), "Release email sent");

        Ok(ReleaseSummary {
            artifact: package.path,
            remote_path: uploaded.remote_path,
            download_url: uploaded.download_url,
            version,
            subject: email.subject,
            recipients: config.recipients.clone(),
        })
    }
}

/// Picks the package from build metadata when present, otherwise by pattern.
///
/// With metadata the upload is renamed after app name and version; without
/// it the version is only known once the changelog is parsed, so the package
/// keeps its own file name.
fn locate_package(config: &ReleaseConfig) -> Result<LocatedPackage> {
    match BuildMetadata::load(&config.release_dir)? {
        Some(metadata) => {
            let path = metadata.existing_package()?.to_path_buf();
            info!(path = %path.display(), version = %metadata.version, "Using package from build metadata");
            Ok(LocatedPackage {
                remote_name: artifact::remote_file_name(&config.app_name, &metadata.version),
                path,
                version: Some(metadata.version),
            })
        }
        None => {
            let path = artifact::locate(&config.release_dir, ARTIFACT_PATTERN)?;
            let remote_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or_else(|| ReleaseError::NoArtifactFound {
                    dir: config.release_dir.clone(),
                    pattern: ARTIFACT_PATTERN.to_string(),
                })?;
            Ok(LocatedPackage {
                path,
                remote_name,
                version: None,
            })
        }
    }
}

fn version_from_entry(entry: &ChangelogEntry) -> Result<String> {
    entry.version().ok_or_else(|| {
        ReleaseError::MalformedChangelog(format!(
            "no version number in title '{}' and no build metadata to take it from",
            entry.version_title
        ))
    })
}
