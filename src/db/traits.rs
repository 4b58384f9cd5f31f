// Database Traits
// Narrow repository interfaces the reconciler and mailer depend on

use crate::certificates::Certificate;
use crate::db::models::{NameSetRecord, UncoveredCertificate};
use crate::expiration::ExpiryWindow;
use crate::notify::Recipient;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Issued certificates and their derived name-set index
#[async_trait]
pub trait CertificateStore: Send + Sync {
    /// Up to `limit` certificates expiring after `as_of` that have no name-set
    /// row, most recently issued first. `issued_after` optionally bounds the
    /// lookback.
    async fn find_uncovered(
        &self,
        limit: usize,
        as_of: DateTime<Utc>,
        issued_after: Option<DateTime<Utc>>,
    ) -> crate::Result<Vec<UncoveredCertificate>>;

    /// Upsert a name-set row; identical repeated writes are harmless
    async fn write_name_set(&self, name_set: &NameSetRecord) -> crate::Result<()>;

    /// Get the name-set row for a serial
    async fn name_set(&self, serial: &str) -> crate::Result<Option<NameSetRecord>>;

    /// Record that an expiration notice went out for these serials
    async fn mark_nagged(&self, serials: &[String], at: DateTime<Utc>) -> crate::Result<u64>;
}

/// Ownership index from contacts to certificates
#[async_trait]
pub trait RecipientIndex: Send + Sync {
    /// Distinct recipients owning certificates due in `window`
    async fn recipients_expiring(&self, window: &ExpiryWindow) -> crate::Result<Vec<Recipient>>;

    /// The recipient's certificates due in `window`, soonest first
    async fn certificates_for(
        &self,
        recipient: &Recipient,
        window: &ExpiryWindow,
        limit: usize,
    ) -> crate::Result<Vec<Certificate>>;
}
