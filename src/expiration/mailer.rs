// Expiration Mailer - walks the nag windows and notifies every recipient once

use crate::Result;
use crate::db::traits::{CertificateStore, RecipientIndex};
use crate::error::WardenError;
use crate::expiration::aggregator::{ExpirationAggregator, ExpirationNotice};
use crate::expiration::window::ExpiryWindow;
use crate::notify::{Notifier, Recipient};
use crate::stats::{self, Counters};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Default cap on certificates fetched per recipient and window
pub const DEFAULT_CERTIFICATE_LIMIT: usize = 100;

#[derive(Debug, Clone)]
pub struct MailerSettings {
    /// Warning horizons, e.g. 1, 3 and 7 days before expiry
    pub nag_horizons: Vec<Duration>,
    pub certificate_limit: usize,
    /// Deliver without recording nags, so a real run later still sends
    pub dry_run: bool,
}

impl Default for MailerSettings {
    fn default() -> Self {
        Self {
            nag_horizons: vec![Duration::days(1), Duration::days(3), Duration::days(7)],
            certificate_limit: DEFAULT_CERTIFICATE_LIMIT,
            dry_run: false,
        }
    }
}

/// Notices digested for one recipient in one window
struct Dispatch {
    recipient: Recipient,
    notices: Vec<ExpirationNotice>,
}

/// A notice that could not be delivered
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryFailure {
    pub recipient: String,
    pub serial: String,
    pub reason: String,
}

/// Outcome of a mailer run
#[derive(Debug, Clone, Default, Serialize)]
pub struct MailerReport {
    pub windows: usize,
    pub recipients: usize,
    pub notices: usize,
    pub sent: usize,
    pub failed: usize,
    /// Certificates recorded as nagged
    pub marked: u64,
    pub cancelled: bool,
    pub failures: Vec<DeliveryFailure>,
}

impl MailerReport {
    /// `PartialFailure` when any notice was not delivered
    pub fn failure_summary(&self) -> Option<WardenError> {
        (self.failed > 0).then(|| WardenError::PartialFailure {
            failed: self.failed,
            total: self.notices,
        })
    }
}

/// Sends one notice per domain cluster to every contact with expiring certificates
pub struct ExpirationMailer {
    store: Arc<dyn CertificateStore>,
    index: Arc<dyn RecipientIndex>,
    notifier: Arc<dyn Notifier>,
    aggregator: ExpirationAggregator,
    settings: MailerSettings,
    now: Option<DateTime<Utc>>,
    running: Arc<AtomicBool>,
}

impl ExpirationMailer {
    pub fn new(
        store: Arc<dyn CertificateStore>,
        index: Arc<dyn RecipientIndex>,
        notifier: Arc<dyn Notifier>,
        aggregator: ExpirationAggregator,
        settings: MailerSettings,
    ) -> Self {
        Self {
            store,
            index,
            notifier,
            aggregator,
            settings,
            now: None,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Pin the reference time instead of reading the clock
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    /// Share a cancellation flag, checked before each window and recipient
    pub fn with_running(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = running;
        self
    }

    pub fn as_of(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }

    /// Process every nag window, shortest horizon first.
    ///
    /// Delivery failures are counted and reported; store errors abort the run.
    pub async fn run(&self, counters: &mut Counters) -> Result<MailerReport> {
        let now = self.as_of();
        let windows = ExpiryWindow::series(now, &self.settings.nag_horizons);
        let mut report = MailerReport::default();

        tracing::info!(
            "Sending expiration notices via {} for {} windows",
            self.notifier.channel_name(),
            windows.len()
        );

        for window in &windows {
            if !self.running.load(Ordering::SeqCst) {
                report.cancelled = true;
                break;
            }
            self.run_window(window, now, counters, &mut report).await?;
            report.windows += 1;
        }

        if report.cancelled {
            tracing::warn!("Mailer cancelled after {} windows", report.windows);
        }
        tracing::info!(
            "Mailer finished: {} notices to {} recipients, {} sent, {} failed",
            report.notices,
            report.recipients,
            report.sent,
            report.failed
        );
        Ok(report)
    }

    async fn run_window(
        &self,
        window: &ExpiryWindow,
        now: DateTime<Utc>,
        counters: &mut Counters,
        report: &mut MailerReport,
    ) -> Result<()> {
        let recipients = self
            .index
            .recipients_expiring(window)
            .await
            .inspect_err(|e| tracing::error!("Failed to list recipients: {}", e))?;

        tracing::info!(
            "Window of {} days: {} recipients",
            window.horizon.num_days(),
            recipients.len()
        );

        // every digest is built before the first send
        let mut plan = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            let certificates = self
                .index
                .certificates_for(&recipient, window, self.settings.certificate_limit)
                .await
                .inspect_err(|e| {
                    tracing::error!("Failed to load certificates for {}: {}", recipient, e)
                })?;
            let notices = self.aggregator.digest(&certificates, now)?;
            plan.push(Dispatch { recipient, notices });
        }

        // a serial is marked only when every notice covering it went out
        let mut delivered: BTreeSet<String> = BTreeSet::new();
        let mut held: BTreeSet<String> = BTreeSet::new();

        for dispatch in &plan {
            if report.cancelled || !self.running.load(Ordering::SeqCst) {
                report.cancelled = true;
                for notice in &dispatch.notices {
                    held.extend(notice.member_serials.iter().cloned());
                }
                continue;
            }
            self.notify_recipient(dispatch, counters, report, &mut delivered, &mut held)
                .await;
            report.recipients += 1;
        }

        let serials: Vec<String> = delivered.difference(&held).cloned().collect();
        if serials.is_empty() {
            return Ok(());
        }
        if self.settings.dry_run {
            tracing::info!("Dry run: leaving {} certificates unmarked", serials.len());
            return Ok(());
        }

        let marked = self.store.mark_nagged(&serials, now).await?;
        counters.inc(stats::MAILER_MARKED, marked);
        report.marked += marked;
        Ok(())
    }

    async fn notify_recipient(
        &self,
        dispatch: &Dispatch,
        counters: &mut Counters,
        report: &mut MailerReport,
        delivered: &mut BTreeSet<String>,
        held: &mut BTreeSet<String>,
    ) {
        let recipient = &dispatch.recipient;

        for notice in &dispatch.notices {
            report.notices += 1;
            match self.notifier.send(recipient, notice).await {
                Ok(()) => {
                    tracing::debug!("Sent notice for {} to {}", notice.serial, recipient);
                    counters.inc(stats::MAILER_SENT, 1);
                    report.sent += 1;
                    delivered.extend(notice.member_serials.iter().cloned());
                }
                Err(e) => {
                    tracing::warn!("Failed to notify {} about {}: {}", recipient, notice.serial, e);
                    counters.inc(stats::MAILER_FAILED, 1);
                    report.failed += 1;
                    report.failures.push(DeliveryFailure {
                        recipient: recipient.to_string(),
                        serial: notice.serial.clone(),
                        reason: e.to_string(),
                    });
                    held.extend(notice.member_serials.iter().cloned());
                }
            }
        }
    }
}
