//! Release package discovery.

use std::fs;
use std::path::{Path, PathBuf};

use globset::Glob;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{ReleaseError, Result};

/// File name pattern of release packages.
pub const ARTIFACT_PATTERN: &str = "*.apk";

/// Build output description written next to the package by the Android build.
pub const BUILD_METADATA_FILE: &str = "output.json";

/// Returns the single file in `dir` whose name matches `pattern`.
///
/// Subdirectories are not searched.
pub fn locate(dir: &Path, pattern: &str) -> Result<PathBuf> {
    let matcher = Glob::new(pattern)
        .map_err(|e| ReleaseError::Configuration(format!("invalid artifact pattern: {e}")))?
        .compile_matcher();

    let entries = fs::read_dir(dir).map_err(|e| ReleaseError::io(dir, e))?;

    let mut matches = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ReleaseError::io(dir, e))?;
        let path = entry.path();
        if path.is_file() && matcher.is_match(entry.file_name()) {
            matches.push(path);
        }
    }
    matches.sort();

    debug!(dir = %dir.display(), pattern, count = matches.len(), "Scanned release directory");

    match matches.len() {
        0 => Err(ReleaseError::NoArtifactFound {
            dir: dir.to_path_buf(),
            pattern: pattern.to_string(),
        }),
        1 => {
            let path = matches.remove(0);
            info!(path = %path.display(), "Found release package");
            Ok(path)
        }
        _ => Err(ReleaseError::AmbiguousArtifact {
            dir: dir.to_path_buf(),
            pattern: pattern.to_string(),
            matches,
        }),
    }
}

#[derive(Deserialize)]
struct OutputEntry {
    #[serde(rename = "apkInfo")]
    apk_info: ApkInfo,
}

#[derive(Deserialize)]
struct ApkInfo {
    #[serde(rename = "versionName")]
    version_name: String,
    #[serde(rename = "outputFile")]
    output_file: String,
}

/// Version and package file taken from the build's `output.json`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildMetadata {
    /// Version name of the built package.
    pub version: String,
    /// Package path, resolved against the release directory.
    pub package: PathBuf,
}

impl BuildMetadata {
    /// Loads `output.json` from the release directory, if there is one.
    pub fn load(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(BUILD_METADATA_FILE);
        if !path.is_file() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(|e| ReleaseError::io(&path, e))?;
        let entries: Vec<OutputEntry> = serde_json::from_str(&content).map_err(|e| {
            ReleaseError::Configuration(format!("{} is not valid build output: {e}", path.display()))
        })?;
        let first = entries.into_iter().next().ok_or_else(|| {
            ReleaseError::Configuration(format!("{} lists no build outputs", path.display()))
        })?;

        debug!(
            version = %first.apk_info.version_name,
            output_file = %first.apk_info.output_file,
            "Loaded build metadata"
        );

        Ok(Some(Self {
            version: first.apk_info.version_name,
            package: dir.join(first.apk_info.output_file),
        }))
    }

    /// Returns the package path after checking it exists.
    pub fn existing_package(&self) -> Result<&Path> {
        if self.package.is_file() {
            Ok(&self.package)
        } else {
            Err(ReleaseError::NoArtifactFound {
                dir: self
                    .package
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_default(),
                pattern: self
                    .package
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            })
        }
    }
}

/// Builds the remote file name for a release, e.g. `("My App", "1.03")` gives
/// `myapp_1_03.apk`.
pub fn remote_file_name(app_name: &str, version: &str) -> String {
    format!(
        "{}_{}.apk",
        app_name.to_lowercase(),
        version.replace('.', "_")
    )
    .replace(' ', "")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dir_with(files: &[&str]) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        for file in files {
            fs::write(dir.path().join(file), b"data").unwrap();
        }
        dir
    }

    #[test]
    fn locates_single_package() {
        let dir = dir_with(&["app-release.apk", "mapping.txt", "output.json"]);
        let found = locate(dir.path(), ARTIFACT_PATTERN).unwrap();
        assert_eq!(found, dir.path().join("app-release.apk"));
    }

    #[test]
    fn no_package_is_an_error() {
        let dir = dir_with(&["mapping.txt"]);
        let err = locate(dir.path(), ARTIFACT_PATTERN).unwrap_err();
        assert!(matches!(err, ReleaseError::NoArtifactFound { .. }));
    }

    #[test]
    fn several_packages_are_ambiguous() {
        let dir = dir_with(&["b.apk", "a.apk"]);
        match locate(dir.path(), ARTIFACT_PATTERN).unwrap_err() {
            ReleaseError::AmbiguousArtifact { matches, .. } => {
                assert_eq!(matches, vec![dir.path().join("a.apk"), dir.path().join("b.apk")]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn directories_are_not_packages() {
        let dir = dir_with(&["real.apk"]);
        fs::create_dir(dir.path().join("nested.apk")).unwrap();
        assert_eq!(
            locate(dir.path(), ARTIFACT_PATTERN).unwrap(),
            dir.path().join("real.apk")
        );
    }

    #[test]
    fn missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = locate(&dir.path().join("nope"), ARTIFACT_PATTERN).unwrap_err();
        assert!(matches!(err, ReleaseError::Io { .. }));
    }

    #[test]
    fn build_metadata_absent() {
        let dir = dir_with(&["a.apk"]);
        assert_eq!(BuildMetadata::load(dir.path()).unwrap(), None);
    }

    #[test]
    fn build_metadata_resolves_package() {
        let dir = dir_with(&["app-release.apk"]);
        fs::write(
            dir.path().join(BUILD_METADATA_FILE),
            r#"[{"outputType":{"type":"APK"},"apkInfo":{"type":"MAIN","versionCode":7,"versionName":"1.03","outputFile":"app-release.apk"},"path":"app-release.apk"}]"#,
        )
        .unwrap();

        let metadata = BuildMetadata::load(dir.path()).unwrap().unwrap();
        assert_eq!(metadata.version, "1.03");
        assert_eq!(
            metadata.existing_package().unwrap(),
            dir.path().join("app-release.apk")
        );
    }

    #[test]
    fn build_metadata_pointing_nowhere() {
        let dir = dir_with(&[]);
        fs::write(
            dir.path().join(BUILD_METADATA_FILE),
            r#"[{"apkInfo":{"versionName":"1.0","outputFile":"gone.apk"}}]"#,
        )
        .unwrap();

        let metadata = BuildMetadata::load(dir.path()).unwrap().unwrap();
        assert!(matches!(
            metadata.existing_package().unwrap_err(),
            ReleaseError::NoArtifactFound { .. }
        ));
    }

    #[test]
    fn build_metadata_with_wrong_shape() {
        let dir = dir_with(&[]);
        fs::write(dir.path().join(BUILD_METADATA_FILE), "[]").unwrap();
        assert!(matches!(
            BuildMetadata::load(dir.path()).unwrap_err(),
            ReleaseError::Configuration(_)
        ));

        fs::write(dir.path().join(BUILD_METADATA_FILE), r#"{"apkInfo":{}}"#).unwrap();
        assert!(matches!(
            BuildMetadata::load(dir.path()).unwrap_err(),
            ReleaseError::Configuration(_)
        ));
    }

    #[test]
    fn remote_file_names() {
        assert_eq!(remote_file_name("MyApp", "1.03"), "myapp_1_03.apk");
        assert_eq!(remote_file_name("Cool App", "2.0.1"), "coolapp_2_0_1.apk");
    }
}
