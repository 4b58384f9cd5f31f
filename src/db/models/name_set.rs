// Name Set Record Model
// Derived serial -> name digest index used for renewal detection

use crate::certificates::NameDigest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One row of the `name_sets` table; at most one per serial
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct NameSetRecord {
    pub serial: String,
    pub set_hash: Vec<u8>,
    /// Copied from the certificate for indexing
    pub issued: DateTime<Utc>,
}

impl NameSetRecord {
    pub fn new(serial: impl Into<String>, set_hash: NameDigest, issued: DateTime<Utc>) -> Self {
        Self {
            serial: serial.into(),
            set_hash: set_hash.to_vec(),
            issued,
        }
    }

    pub fn hex_hash(&self) -> String {
        hex::encode(&self.set_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificates::hash_names;

    #[test]
    fn test_name_set_record_creation() {
        let issued = Utc::now();
        let record = NameSetRecord::new("0539", hash_names(["example.com"]), issued);

        assert_eq!(record.serial, "0539");
        assert_eq!(record.set_hash.len(), 32);
        assert_eq!(record.hex_hash().len(), 64);
        assert_eq!(record.issued, issued);
    }
}
