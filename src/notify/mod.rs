// Notification delivery - recipients and the channels that reach them

pub mod email;
pub mod log;

use crate::Result;
use crate::expiration::ExpirationNotice;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use email::SmtpNotifier;
pub use log::LogNotifier;

/// A normalized contact address.
///
/// Registration contacts are stored as `mailto:` URLs in whatever case the
/// subscriber typed them; two spellings of the same mailbox are one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Recipient(String);

impl Recipient {
    /// Normalize a stored contact; `None` for blank or non-mail contacts
    pub fn parse(contact: &str) -> Option<Self> {
        let trimmed = contact.trim();
        let address = match trimmed.get(..7) {
            Some(scheme) if scheme.eq_ignore_ascii_case("mailto:") => &trimmed[7..],
            _ if trimmed.contains(':') => return None,
            _ => trimmed,
        };

        let address = address.trim().to_lowercase();
        if address.is_empty() || !address.contains('@') {
            return None;
        }
        Some(Self(address))
    }

    pub fn address(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Delivery channel for expiration notices
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one notice to one recipient
    async fn send(&self, recipient: &Recipient, notice: &ExpirationNotice) -> Result<()>;

    /// Channel name for logging
    fn channel_name(&self) -> &str;
}
