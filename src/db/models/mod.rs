// Database Models Module
// Row shapes read from and written to the certificate store

pub mod certificate;
pub mod expiring;
pub mod name_set;

pub use certificate::{CertificateRecord, UncoveredCertificate};
pub use expiring::{ExpiringRow, certificates_in, recipients_in};
pub use name_set::NameSetRecord;
