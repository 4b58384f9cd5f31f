// MailerCommand - Expiration notices for every nag window
// Copyright (C) 2025 Marc Rivero (@seifreed)
// Licensed under GPL-3.0

use super::{Command, export_report, shutdown_flag, summary_line};
use crate::config::WardenConfig;
use crate::db::WardenDatabase;
use crate::error::WardenError;
use crate::expiration::{ExpirationAggregator, ExpirationMailer};
use crate::notify::{LogNotifier, Notifier, SmtpNotifier};
use crate::stats::Counters;
use crate::{Args, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// MailerCommand sends one notice per domain cluster to each expiring contact
pub struct MailerCommand {
    args: Args,
}

impl MailerCommand {
    /// Create a new MailerCommand with the given arguments
    pub fn new(args: Args) -> Self {
        Self { args }
    }
}

/// SMTP delivery, or a logging channel in dry-run mode
fn build_notifier(config: &WardenConfig) -> Result<Arc<dyn Notifier>> {
    if config.mailer.dry_run {
        return Ok(Arc::new(LogNotifier::new()));
    }

    let smtp = config.mailer.smtp.clone().ok_or_else(|| WardenError::Config {
        message: "mailer.smtp is required unless dry_run is set".to_string(),
    })?;
    Ok(Arc::new(SmtpNotifier::new(smtp, &config.mailer.from_address)?))
}

#[async_trait]
impl Command for MailerCommand {
    async fn execute(&self) -> Result<()> {
        let config = self.args.load_config()?;
        config.validate()?;

        let notifier = build_notifier(&config)?;
        let aggregator = ExpirationAggregator::new(config.notice_template()?);
        let db = WardenDatabase::new(&config.database).await?;
        let repository = db.repository();

        let mut mailer = ExpirationMailer::new(
            repository.clone(),
            repository,
            notifier,
            aggregator,
            config.mailer_settings(),
        )
        .with_running(shutdown_flag());
        if let Some(now) = self.args.reference_time()? {
            mailer = mailer.with_now(now);
        }

        info!("Sending expiration notices as of {}", mailer.as_of());
        let mut counters = Counters::new();
        let result = mailer.run(&mut counters).await;
        db.close().await;

        let report = result?;
        counters.log();
        if let Some(path) = &self.args.json {
            export_report(&report, path)?;
        }
        println!("{}", summary_line("mailer", report.notices, report.failed));

        if let Some(failure) = report.failure_summary() {
            return Err(failure.into());
        }
        if report.cancelled {
            return Err(WardenError::Cancelled.into());
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "MailerCommand"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SmtpConfig;

    #[test]
    fn test_dry_run_uses_log_channel() {
        let mut config = WardenConfig::default();
        config.mailer.dry_run = true;
        assert_eq!(build_notifier(&config).unwrap().channel_name(), "log");
    }

    #[test]
    fn test_smtp_channel() {
        let mut config = WardenConfig::default();
        config.mailer.from_address = "Expiry Bot <expiry@example.com>".to_string();
        config.mailer.smtp = Some(SmtpConfig {
            server: "smtp.example.com".to_string(),
            port: 587,
            username: None,
            password: None,
            use_tls: true,
        });
        assert_eq!(build_notifier(&config).unwrap().channel_name(), "smtp");
    }

    #[test]
    fn test_missing_smtp_settings() {
        assert!(build_notifier(&WardenConfig::default()).is_err());
    }
}
