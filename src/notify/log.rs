// Log Notifier - dry-run channel that only records what would be sent

use crate::Result;
use crate::expiration::ExpirationNotice;
use crate::notify::{Notifier, Recipient};
use async_trait::async_trait;
use std::sync::Mutex;

/// Logs notices instead of delivering them and keeps a transcript
#[derive(Default)]
pub struct LogNotifier {
    sent: Mutex<Vec<(Recipient, String)>>,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every (recipient, body) pair seen so far, in send order
    pub fn transcript(&self) -> Vec<(Recipient, String)> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, recipient: &Recipient, notice: &ExpirationNotice) -> Result<()> {
        tracing::info!(
            recipient = %recipient,
            serial = %notice.serial,
            days = notice.days_until_expiry,
            "[dry-run] {}",
            notice.body
        );

        if let Ok(mut sent) = self.sent.lock() {
            sent.push((recipient.clone(), notice.body.clone()));
        }
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "log"
    }
}
