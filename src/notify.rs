//! Release email delivery.

pub mod zapier;

use std::future::Future;
use std::pin::Pin;

use crate::error::Result;
use crate::template::RenderedEmail;

pub use zapier::ZapierNotifier;

/// Delivers a rendered email to a list of recipients.
pub trait Notifier: Send + Sync {
    /// Sends the email. Failures are reported as
    /// [`ReleaseError::Delivery`](crate::ReleaseError::Delivery).
    fn notify<'a>(
        &'a self,
        recipients: &'a [String],
        email: &'a RenderedEmail,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}
