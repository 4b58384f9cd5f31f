// Email Notifier - Using lettre

use crate::Result;
use crate::config::SmtpConfig;
use crate::error::WardenError;
use crate::expiration::ExpirationNotice;
use crate::notify::{Notifier, Recipient};
use async_trait::async_trait;
use lettre::message::{Mailbox, header};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

/// Sends expiration notices over SMTP
pub struct SmtpNotifier {
    config: SmtpConfig,
    from: Mailbox,
}

impl SmtpNotifier {
    /// Create new SMTP notifier; fails on an unparsable sender address
    pub fn new(config: SmtpConfig, from_address: &str) -> Result<Self> {
        let from: Mailbox = from_address.parse().map_err(WardenError::from)?;
        Ok(Self { config, from })
    }

    /// Build a plain-text message for one recipient
    fn build_message(&self, recipient: &Recipient, notice: &ExpirationNotice) -> Result<Message> {
        let to: Mailbox = recipient.address().parse().map_err(WardenError::from)?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(notice.subject.clone())
            .header(header::ContentType::TEXT_PLAIN)
            .body(notice.body.clone())?;

        Ok(message)
    }

    /// Get SMTP transport
    fn get_transport(&self) -> Result<SmtpTransport> {
        let builder = if self.config.use_tls {
            SmtpTransport::starttls_relay(&self.config.server)?
        } else {
            SmtpTransport::builder_dangerous(&self.config.server)
        };

        let builder = builder.port(self.config.port);
        let builder = match (&self.config.username, &self.config.password) {
            (Some(user), Some(pass)) => builder.credentials(Credentials::new(user.clone(), pass.clone())),
            _ => builder,
        };

        Ok(builder.build())
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, recipient: &Recipient, notice: &ExpirationNotice) -> Result<()> {
        let message = self.build_message(recipient, notice)?;
        let transport = self.get_transport()?;
        let to = recipient.to_string();

        // lettre's SmtpTransport blocks
        tokio::task::spawn_blocking(move || {
            transport.send(&message).map_err(|e| WardenError::Notification {
                recipient: to,
                details: e.to_string(),
            })
        })
        .await??;

        Ok(())
    }

    fn channel_name(&self) -> &str {
        "smtp"
    }
}
