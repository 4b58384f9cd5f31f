// Expiring Row Model
// One (contact, certificate) pair inside a nag window

use crate::certificates::Certificate;
use crate::expiration::ExpiryWindow;
use crate::notify::Recipient;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::collections::{BTreeSet, HashSet};

/// Join of `registration_contacts` and `certificates`
#[derive(Debug, Clone, FromRow)]
pub struct ExpiringRow {
    pub contact: String,
    pub serial: String,
    pub issued: DateTime<Utc>,
    pub expires: DateTime<Utc>,
    /// Not selected when only recipients are listed
    #[sqlx(default)]
    pub der: Vec<u8>,
    pub last_expiration_nag_sent: Option<DateTime<Utc>>,
}

/// Distinct recipients owning at least one certificate due in `window`
pub fn recipients_in(rows: &[ExpiringRow], window: &ExpiryWindow) -> Vec<Recipient> {
    let recipients: BTreeSet<Recipient> = rows
        .iter()
        .filter(|row| window.is_due(row.expires, row.last_expiration_nag_sent))
        .filter_map(|row| Recipient::parse(&row.contact))
        .collect();
    recipients.into_iter().collect()
}

/// Certificates of `recipient` due in `window`, soonest first, at most `limit`.
///
/// Rows whose DER cannot be decoded are skipped with a warning; they still get
/// retried by the next run since they are never marked.
pub fn certificates_in(
    rows: Vec<ExpiringRow>,
    recipient: &Recipient,
    window: &ExpiryWindow,
    limit: usize,
) -> Vec<Certificate> {
    let mut seen = HashSet::new();
    let mut certificates = Vec::new();

    for row in rows {
        if !window.is_due(row.expires, row.last_expiration_nag_sent)
            || Recipient::parse(&row.contact).as_ref() != Some(recipient)
            || !seen.insert(row.serial.clone())
        {
            continue;
        }

        match Certificate::from_der(&row.serial, row.issued, row.der) {
            Ok(mut cert) => {
                // the store's expiry column is authoritative
                cert.expires = row.expires;
                certificates.push(cert);
            }
            Err(e) => {
                tracing::warn!("Skipping certificate {} for {}: {}", row.serial, recipient, e);
            }
        }
    }

    certificates.sort_by(|a, b| a.expires.cmp(&b.expires).then_with(|| a.serial.cmp(&b.serial)));
    certificates.truncate(limit);
    certificates
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn row(contact: &str, serial: &str, expires_in: Duration) -> ExpiringRow {
        ExpiringRow {
            contact: contact.to_string(),
            serial: serial.to_string(),
            issued: now() - Duration::days(80),
            expires: now() + expires_in,
            der: Vec::new(),
            last_expiration_nag_sent: None,
        }
    }

    #[test]
    fn test_recipients_are_normalized_and_distinct() {
        let window = ExpiryWindow::series(now(), &[Duration::days(7)])[0];
        let rows = vec![
            row("mailto:One@example.com", "01", Duration::days(2)),
            row("mailto:one@example.com", "02", Duration::days(3)),
            row("mailto:two@example.com", "03", Duration::days(30)),
            row("tel:+15555550100", "01", Duration::days(2)),
        ];

        let recipients = recipients_in(&rows, &window);
        assert_eq!(recipients, vec![Recipient::parse("one@example.com").unwrap()]);
    }

    #[test]
    fn test_already_nagged_rows_are_skipped() {
        let window = ExpiryWindow::series(now(), &[Duration::days(7)])[0];
        let mut nagged = row("mailto:one@example.com", "01", Duration::days(2));
        nagged.last_expiration_nag_sent = Some(now() - Duration::hours(1));

        assert!(recipients_in(&[nagged], &window).is_empty());
    }

    #[test]
    fn test_undecodable_rows_are_skipped() {
        let window = ExpiryWindow::series(now(), &[Duration::days(7)])[0];
        let recipient = Recipient::parse("one@example.com").unwrap();
        let rows = vec![row("mailto:one@example.com", "01", Duration::days(2))];

        assert!(certificates_in(rows, &recipient, &window, 10).is_empty());
    }
}
