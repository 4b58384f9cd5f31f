// Certificate Parser - Decode stored DER into the fields the reconciler needs

use crate::Result;
use crate::error::WardenError;
use chrono::{DateTime, Utc};
use x509_parser::prelude::*;

/// Fields extracted from a DER-encoded certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedCertificate {
    pub serial: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub dns_names: Vec<String>,
}

/// Hex-encode a raw serial, dropping leading zero bytes
pub fn normalize_serial(raw: &[u8]) -> String {
    let start = raw.iter().position(|b| *b != 0).unwrap_or(raw.len());
    if start == raw.len() {
        return "00".to_string();
    }
    hex::encode(&raw[start..])
}

/// Decode a certificate. `serial` is the store's key, used only for error context.
pub fn decode_certificate(serial: &str, der: &[u8]) -> Result<DecodedCertificate> {
    let decode_error = |details: String| WardenError::Decode {
        serial: serial.to_string(),
        details,
    };

    let (_, cert) = X509Certificate::from_der(der).map_err(|e| decode_error(format!("{:?}", e)))?;

    // Only DNS names take part in the name set
    let mut dns_names = Vec::new();
    match cert.subject_alternative_name() {
        Ok(Some(san)) => {
            for name in &san.value.general_names {
                if let GeneralName::DNSName(dns) = name {
                    dns_names.push(dns.to_string());
                }
            }
        }
        Ok(None) => {}
        Err(e) => return Err(decode_error(format!("invalid subjectAltName: {}", e)).into()),
    }

    let validity = cert.validity();
    let not_before = DateTime::from_timestamp(validity.not_before.timestamp(), 0)
        .ok_or_else(|| decode_error("notBefore out of range".to_string()))?;
    let not_after = DateTime::from_timestamp(validity.not_after.timestamp(), 0)
        .ok_or_else(|| decode_error("notAfter out of range".to_string()))?;

    Ok(DecodedCertificate {
        serial: normalize_serial(cert.raw_serial()),
        not_before,
        not_after,
        dns_names,
    })
}
