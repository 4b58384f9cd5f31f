// Certificate Record Model
// Issued certificates as stored, and the narrow row the backfill reads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Certificate row in the `certificates` table
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CertificateRecord {
    pub serial: String,
    /// Owning account; contacts hang off it
    pub registration_id: i64,
    pub der: Vec<u8>,
    pub issued: DateTime<Utc>,
    pub expires: DateTime<Utc>,
    #[sqlx(default)]
    pub last_expiration_nag_sent: Option<DateTime<Utc>>,
}

/// A certificate without a name-set row, newest issuance first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UncoveredCertificate {
    pub serial: String,
    pub issued: DateTime<Utc>,
    pub der: Vec<u8>,
}

impl CertificateRecord {
    /// Create new certificate record
    pub fn new(
        serial: impl Into<String>,
        registration_id: i64,
        der: Vec<u8>,
        issued: DateTime<Utc>,
        expires: DateTime<Utc>,
    ) -> Self {
        Self {
            serial: serial.into(),
            registration_id,
            der,
            issued,
            expires,
            last_expiration_nag_sent: None,
        }
    }

    /// Set the last expiration nag time
    pub fn with_last_nag(mut self, at: DateTime<Utc>) -> Self {
        self.last_expiration_nag_sent = Some(at);
        self
    }

    pub fn uncovered(&self) -> UncoveredCertificate {
        UncoveredCertificate {
            serial: self.serial.clone(),
            issued: self.issued,
            der: self.der.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_certificate_record_creation() {
        let now = Utc::now();
        let cert = CertificateRecord::new("0539", 7, vec![0x30], now, now + Duration::days(90));

        assert_eq!(cert.serial, "0539");
        assert_eq!(cert.registration_id, 7);
        assert!(cert.last_expiration_nag_sent.is_none());

        let uncovered = cert.uncovered();
        assert_eq!(uncovered.serial, "0539");
        assert_eq!(uncovered.issued, now);
        assert_eq!(uncovered.der, vec![0x30]);
    }
}
