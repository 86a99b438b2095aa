//! Cloud storage upload.

pub mod dropbox;

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use crate::error::Result;

pub use dropbox::{DropboxEndpoints, DropboxUploader};

/// Where an uploaded package ended up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadedFile {
    /// Path of the file inside the remote storage.
    pub remote_path: String,
    /// Public direct-download link.
    pub download_url: String,
}

/// Uploads a package and shares it publicly.
pub trait StorageUploader: Send + Sync {
    /// Uploads `file` as `remote_name` inside `remote_folder` and returns its
    /// download link. Failures are reported as [`ReleaseError::Upload`](crate::ReleaseError::Upload).
    fn upload<'a>(
        &'a self,
        file: &'a Path,
        remote_folder: &'a str,
        remote_name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<UploadedFile>> + Send + 'a>>;
}

/// Joins a remote folder and file name into an absolute storage path.
///
/// Slashes around the folder are collapsed so `"/builds/"` and `"builds"`
/// give the same result.
pub fn remote_path(folder: &str, file_name: &str) -> String {
    let folder = folder.trim_matches('/');
    if folder.is_empty() {
        format!("/{file_name}")
    } else {
        format!("/{folder}/{file_name}")
    }
}
