//! Dropbox upload client.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use super::{remote_path, StorageUploader, UploadedFile};
use crate::error::{ReleaseError, Result};
use crate::http::{HttpClient, HttpError, REQUEST_TIMEOUT};

/// Base URLs of the Dropbox HTTP API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DropboxEndpoints {
    /// RPC endpoint host (delete, sharing).
    pub api: String,
    /// Content endpoint host (upload).
    pub content: String,
}

impl Default for DropboxEndpoints {
    fn default() -> Self {
        Self {
            api: "https://api.dropboxapi.com".to_string(),
            content: "https://content.dropboxapi.com".to_string(),
        }
    }
}

#[derive(Serialize)]
struct PathArg<'a> {
    path: &'a str,
}

#[derive(Serialize)]
struct UploadArg<'a> {
    path: &'a str,
    mode: &'static str,
    autorename: bool,
    strict_conflict: bool,
}

#[derive(Serialize)]
struct ShareSettings {
    requested_visibility: &'static str,
}

#[derive(Serialize)]
struct ShareRequest<'a> {
    path: &'a str,
    settings: ShareSettings,
}

#[derive(Deserialize)]
struct SharedLink {
    url: String,
}

/// Uploads packages to a Dropbox folder and returns public direct links.
pub struct DropboxUploader {
    http: HttpClient,
    token: String,
    endpoints: DropboxEndpoints,
}

impl DropboxUploader {
    /// Creates an uploader talking to the public Dropbox API.
    pub fn new(token: String) -> Result<Self> {
        Self::with_endpoints(token, DropboxEndpoints::default(), REQUEST_TIMEOUT)
    }

    /// Creates an uploader talking to custom API hosts with a custom
    /// per-request timeout.
    pub fn with_endpoints(
        token: String,
        endpoints: DropboxEndpoints,
        timeout: Duration,
    ) -> Result<Self> {
        let http = HttpClient::new(timeout).map_err(ReleaseError::Upload)?;
        Ok(Self {
            http,
            token,
            endpoints,
        })
    }

    fn api_url(&self, route: &str) -> String {
        format!("{}/2/{route}", self.endpoints.api.trim_end_matches('/'))
    }

    fn content_url(&self, route: &str) -> String {
        format!("{}/2/{route}", self.endpoints.content.trim_end_matches('/'))
    }

    /// Removes a previous upload under the same path.
    ///
    /// Errors are only logged: the file usually does not exist yet.
    async fn delete_previous(&self, path: &str) {
        let result = self
            .http
            .post(self.api_url("files/delete_v2"))
            .bearer_auth(&self.token)
            .json(&PathArg { path })
            .send()
            .await;

        match result {
            Ok(response) => debug!(path, status = %response.status(), "Deleted previous upload"),
            Err(e) => warn!(path, "Could not delete previous upload: {e}"),
        }
    }

    async fn put_file(&self, file: &Path, path: &str) -> Result<()> {
        let bytes = tokio::fs::read(file)
            .await
            .map_err(|e| ReleaseError::io(file, e))?;

        let arg = serde_json::to_string(&UploadArg {
            path,
            mode: "overwrite",
            autorename: true,
            strict_conflict: true,
        })
        .map_err(|e| {
            ReleaseError::Upload(HttpError::Rejected {
                action: "Dropbox upload",
                message: format!("failed to encode upload arguments: {e}"),
            })
        })?;

        info!(path, bytes = bytes.len(), "Uploading package to Dropbox");

        let request = self
            .http
            .post(self.content_url("files/upload"))
            .bearer_auth(&self.token)
            .header("Dropbox-API-Arg", arg)
            .header("Content-Type", "application/octet-stream")
            .body(bytes);

        self.http
            .send("Dropbox upload", request)
            .await
            .map_err(ReleaseError::Upload)?;
        Ok(())
    }

    async fn share(&self, path: &str) -> Result<String> {
        const ACTION: &str = "Dropbox share";

        let request = self
            .http
            .post(self.api_url("sharing/create_shared_link_with_settings"))
            .bearer_auth(&self.token)
            .json(&ShareRequest {
                path,
                settings: ShareSettings {
                    requested_visibility: "public",
                },
            });

        let link: SharedLink = self
            .http
            .send(ACTION, request)
            .await
            .map_err(ReleaseError::Upload)?
            .json()
            .await
            .map_err(|source| ReleaseError::Upload(HttpError::Decode { action: ACTION, source }))?;

        debug!(url = %link.url, "Created shared link");
        direct_download_link(&link.url)
    }
}

impl StorageUploader for DropboxUploader {
    fn upload<'a>(
        &'a self,
        file: &'a Path,
        remote_folder: &'a str,
        remote_name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<UploadedFile>> + Send + 'a>> {
        Box::pin(async move {
            let path = remote_path(remote_folder, remote_name);

            self.delete_previous(&path).await;
            self.put_file(file, &path).await?;
            let download_url = self.share(&path).await?;

            Ok(UploadedFile {
                remote_path: path,
                download_url,
            })
        })
    }
}

/// Turns a Dropbox preview link into a direct-download link by forcing `dl=1`.
pub fn direct_download_link(shared: &str) -> Result<String> {
    let mut url = Url::parse(shared)
        .map_err(|e| {
            ReleaseError::Upload(HttpError::Rejected {
                action: "Dropbox share",
                message: format!("invalid shared link '{shared}': {e}"),
            })
        })?;

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "dl")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair("dl", "1");

    Ok(url.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn uploader(server: &MockServer) -> DropboxUploader {
        DropboxUploader::with_endpoints(
            "secret-token".to_string(),
            DropboxEndpoints {
                api: server.uri(),
                content: server.uri(),
            },
            REQUEST_TIMEOUT,
        )
        .unwrap()
    }

    fn package() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("app-release.apk");
        std::fs::write(&file, b"PK\x03\x04apk").unwrap();
        (dir, file)
    }

    #[test]
    fn direct_links() {
        assert_eq!(
            direct_download_link("https://www.dropbox.com/s/abc/app.apk?dl=0").unwrap(),
            "https://www.dropbox.com/s/abc/app.apk?dl=1"
        );
        assert_eq!(
            direct_download_link("https://www.dropbox.com/scl/fi/x/app.apk?rlkey=k1&dl=0").unwrap(),
            "https://www.dropbox.com/scl/fi/x/app.apk?rlkey=k1&dl=1"
        );
        assert_eq!(
            direct_download_link("https://www.dropbox.com/s/abc/app.apk").unwrap(),
            "https://www.dropbox.com/s/abc/app.apk?dl=1"
        );
        assert!(matches!(
            direct_download_link("not a url").unwrap_err(),
            ReleaseError::Upload(_)
        ));
    }

    #[tokio::test]
    async fn uploads_and_shares() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/2/files/delete_v2"))
            .and(body_json(serde_json::json!({"path": "/builds/app_1_0.apk"})))
            .respond_with(ResponseTemplate::new(409))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/2/files/upload"))
            .and(header("authorization", "Bearer secret-token"))
            .and(header("content-type", "application/octet-stream"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/2/sharing/create_shared_link_with_settings"))
            .and(body_json(serde_json::json!({
                "path": "/builds/app_1_0.apk",
                "settings": {"requested_visibility": "public"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "url": "https://www.dropbox.com/s/abc/app_1_0.apk?dl=0"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (_dir, file) = package();
        let uploaded = uploader(&server)
            .upload(&file, "/builds/", "app_1_0.apk")
            .await
            .unwrap();

        assert_eq!(uploaded.remote_path, "/builds/app_1_0.apk");
        assert_eq!(
            uploaded.download_url,
            "https://www.dropbox.com/s/abc/app_1_0.apk?dl=1"
        );

        let requests = server.received_requests().await.unwrap();
        let upload = requests
            .iter()
            .find(|r| r.url.path() == "/2/files/upload")
            .unwrap();
        assert_eq!(upload.body, b"PK\x03\x04apk");

        let arg: serde_json::Value = serde_json::from_str(
            upload
                .headers
                .get("dropbox-api-arg")
                .unwrap()
                .to_str()
                .unwrap(),
        )
        .unwrap();
        assert_eq!(
            arg,
            serde_json::json!({
                "path": "/builds/app_1_0.apk",
                "mode": "overwrite",
                "autorename": true,
                "strict_conflict": true
            })
        );
    }

    #[tokio::test]
    async fn rejected_upload_stops_before_sharing() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/2/files/delete_v2"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/2/files/upload"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid_access_token"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/2/sharing/create_shared_link_with_settings"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let (_dir, file) = package();
        let err = uploader(&server)
            .upload(&file, "builds", "app.apk")
            .await
            .unwrap_err();

        assert!(matches!(err, ReleaseError::Upload(HttpError::Status { .. })), "{err:?}");
        let message = err.to_string();
        assert!(message.contains("401"), "{message}");
        assert!(message.contains("invalid_access_token"), "{message}");
    }

    #[tokio::test]
    async fn slow_upload_times_out() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/2/files/delete_v2"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/2/files/upload"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/2/sharing/create_shared_link_with_settings"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let uploader = DropboxUploader::with_endpoints(
            "secret-token".to_string(),
            DropboxEndpoints {
                api: server.uri(),
                content: server.uri(),
            },
            Duration::from_millis(100),
        )
        .unwrap();

        let (_dir, file) = package();
        let err = uploader
            .upload(&file, "builds", "app.apk")
            .await
            .unwrap_err();

        assert!(matches!(err, ReleaseError::Upload(_)), "{err:?}");
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("timed out"), "{err}");
    }

    #[tokio::test]
    async fn share_response_without_url_is_an_upload_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/2/files/delete_v2"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/2/files/upload"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/2/sharing/create_shared_link_with_settings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 1})))
            .mount(&server)
            .await;

        let (_dir, file) = package();
        let err = uploader(&server)
            .upload(&file, "builds", "app.apk")
            .await
            .unwrap_err();
        assert!(matches!(err, ReleaseError::Upload(_)));
    }

    #[tokio::test]
    async fn missing_package_is_io_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2/files/delete_v2"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let err = uploader(&server)
            .upload(&dir.path().join("missing.apk"), "builds", "app.apk")
            .await
            .unwrap_err();
        assert!(matches!(err, ReleaseError::Io { .. }));
    }
}
