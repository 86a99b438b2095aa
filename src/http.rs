//! Shared HTTP plumbing for the storage and webhook clients.

use std::time::Duration;

use reqwest::{Client, IntoUrl, RequestBuilder, Response, StatusCode};
use thiserror::Error;
use tracing::debug;

/// Default HTTP request timeout for every network call.
///
/// Long enough for a package upload over a slow CI link; an expired request
/// fails the stage it belongs to.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Failure of a call to a remote HTTP API.
#[derive(Error, Debug)]
pub enum HttpError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    /// No response arrived within the request timeout.
    #[error("{action} timed out after {}s", after.as_secs_f32())]
    Timeout {
        /// Request that timed out.
        action: &'static str,
        /// Timeout that expired.
        after: Duration,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The request could not be sent or the connection broke.
    #[error("{action} request failed")]
    Transport {
        /// Request that failed.
        action: &'static str,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-2xx status.
    #[error("{action} returned HTTP {status}: {body}")]
    Status {
        /// Request that was rejected.
        action: &'static str,
        /// Response status.
        status: StatusCode,
        /// Response body, empty when unreadable.
        body: String,
    },

    /// A 2xx response body could not be decoded.
    #[error("{action} returned an unreadable response")]
    Decode {
        /// Request whose response was unreadable.
        action: &'static str,
        /// Underlying decode error.
        #[source]
        source: reqwest::Error,
    },

    /// The response was readable but not usable.
    #[error("{action} rejected: {message}")]
    Rejected {
        /// Request whose result was rejected.
        action: &'static str,
        /// What was wrong with it.
        message: String,
    },
}

/// reqwest client with a fixed per-request timeout.
pub(crate) struct HttpClient {
    client: Client,
    timeout: Duration,
}

impl HttpClient {
    /// Builds a client whose requests expire after `timeout`.
    pub(crate) fn new(timeout: Duration) -> Result<Self, HttpError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(HttpError::Client)?;
        Ok(Self { client, timeout })
    }

    /// Starts a POST request.
    pub(crate) fn post(&self, url: impl IntoUrl) -> RequestBuilder {
        self.client.post(url)
    }

    /// Sends a request and returns the response when its status is 2xx.
    pub(crate) async fn send(
        &self,
        action: &'static str,
        request: RequestBuilder,
    ) -> Result<Response, HttpError> {
        let response = request.send().await.map_err(|source| {
            if source.is_timeout() {
                HttpError::Timeout {
                    action,
                    after: self.timeout,
                    source,
                }
            } else {
                HttpError::Transport { action, source }
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_else(|e| {
            debug!("Failed to read error response body: {e}");
            String::new()
        });
        Err(HttpError::Status {
            action,
            status,
            body,
        })
    }
}
