//! Zapier "catch hook" email relay.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::Serialize;
use tracing::info;
use url::Url;

use super::Notifier;
use crate::error::{ReleaseError, Result};
use crate::http::{HttpClient, REQUEST_TIMEOUT};
use crate::template::RenderedEmail;

/// Payload expected by the email zap.
#[derive(Serialize)]
struct EmailPayload<'a> {
    to: String,
    subject: &'a str,
    body: &'a str,
}

/// Posts release emails to a Zapier webhook.
pub struct ZapierNotifier {
    http: HttpClient,
    hook: Url,
}

impl ZapierNotifier {
    /// Creates a notifier for the given hook URL.
    pub fn new(hook: Url) -> Result<Self> {
        Self::with_timeout(hook, REQUEST_TIMEOUT)
    }

    /// Creates a notifier whose webhook call expires after `timeout`.
    pub fn with_timeout(hook: Url, timeout: Duration) -> Result<Self> {
        let http = HttpClient::new(timeout).map_err(ReleaseError::Delivery)?;
        Ok(Self { http, hook })
    }
}

impl Notifier for ZapierNotifier {
    fn notify<'a>(
        &'a self,
        recipients: &'a [String],
        email: &'a RenderedEmail,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let payload = EmailPayload {
                to: recipients.join(","),
                subject: &email.subject,
                body: &email.body,
            };

            info!(
                recipients = recipients.len(),
                subject = %email.subject,
                "Sending release email through Zapier"
            );

            let request = self.http.post(self.hook.clone()).json(&payload);
            self.http
                .send("Zapier webhook", request)
                .await
                .map_err(ReleaseError::Delivery)?;
            Ok(())
        })
    }
}
