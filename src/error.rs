//! Release pipeline error handling.

use std::path::PathBuf;

use thiserror::Error;

use crate::http::HttpError;

/// Errors raised by a release run.
///
/// Every variant is terminal: the pipeline stops at the first one and the
/// binary exits with [`ReleaseError::exit_code`].
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// The changelog has no terminated first entry or no title line.
    #[error("Malformed changelog: {0}")]
    MalformedChangelog(String),

    /// The email template is missing its `#subject`/`#body` markers.
    #[error("Malformed template: {0}")]
    MalformedTemplate(String),

    /// No package file matched in the release directory.
    #[error("No release package matching '{pattern}' found in {}", dir.display())]
    NoArtifactFound {
        /// Directory that was searched.
        dir: PathBuf,
        /// Pattern or file name that was looked for.
        pattern: String,
    },

    /// More than one package file matched in the release directory.
    #[error(
        "Found {} release packages matching '{pattern}' in {}, expected exactly one",
        matches.len(),
        dir.display()
    )]
    AmbiguousArtifact {
        /// Directory that was searched.
        dir: PathBuf,
        /// Pattern that was looked for.
        pattern: String,
        /// Every matching file.
        matches: Vec<PathBuf>,
    },

    /// The storage provider call failed, timed out or was rejected.
    #[error(transparent)]
    Upload(HttpError),

    /// The notification webhook call failed, timed out or was rejected.
    #[error(transparent)]
    Delivery(HttpError),

    /// A command line option is missing or invalid.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// A local file could not be read.
    #[error("Failed to read {}", path.display())]
    Io {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl ReleaseError {
    /// Returns the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Upload(_) => 1,
            Self::Delivery(_) => 2,
            Self::MalformedTemplate(_) => 3,
            Self::MalformedChangelog(_) => 4,
            Self::NoArtifactFound { .. } | Self::AmbiguousArtifact { .. } => 5,
            Self::Configuration(_) => 6,
            Self::Io { .. } => 7,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias for release operations.
pub type Result<T, E = ReleaseError> = std::result::Result<T, E>;
