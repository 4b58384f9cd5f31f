// Certificates module - Issued certificate records, decoding and name hashing

pub mod names;
pub mod parser;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use names::{hash_names, hex_digest, normalize_names, NameDigest};
pub use parser::{decode_certificate, normalize_serial, DecodedCertificate};

/// An issued certificate as the store hands it out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    /// Lower-case hex serial without leading zero bytes
    pub serial: String,
    pub issued: DateTime<Utc>,
    /// NotAfter
    pub expires: DateTime<Utc>,
    /// DNS Subject Alternative Names in certificate order
    pub dns_names: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub der: Vec<u8>,
}

impl Certificate {
    /// Create a certificate record without DER bytes
    pub fn new(
        serial: impl Into<String>,
        issued: DateTime<Utc>,
        expires: DateTime<Utc>,
        dns_names: Vec<String>,
    ) -> Self {
        Self {
            serial: serial.into(),
            issued,
            expires,
            dns_names,
            der: Vec::new(),
        }
    }

    /// Canonical digest of this certificate's DNS names
    pub fn name_digest(&self) -> NameDigest {
        hash_names(&self.dns_names)
    }

    /// Build a record from stored DER, taking issuance from the store
    pub fn from_der(serial: &str, issued: DateTime<Utc>, der: Vec<u8>) -> crate::Result<Self> {
        let decoded = decode_certificate(serial, &der)?;
        Ok(Self {
            serial: serial.to_string(),
            issued,
            expires: decoded.not_after,
            dns_names: decoded.dns_names,
            der,
        })
    }
}
