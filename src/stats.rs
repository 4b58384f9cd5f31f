// Run Counters
// Explicit counters object handed to each run and returned to the caller

use std::collections::BTreeMap;

/// Uncovered certificates returned by a backfill query
pub const NAMESET_MISSING_FOUND: &str = "backfill.nameset.missing_found";
/// Name sets written by the backfill
pub const NAMESET_ADDED: &str = "backfill.nameset.added";
/// Backfill candidates skipped after a decode or write failure
pub const NAMESET_FAILED: &str = "backfill.nameset.failed";
/// Expiration notices delivered
pub const MAILER_SENT: &str = "mailer.notices.sent";
/// Expiration notices that could not be delivered
pub const MAILER_FAILED: &str = "mailer.notices.failed";
/// Certificates marked as nagged
pub const MAILER_MARKED: &str = "mailer.certificates.marked";

/// Named monotonically increasing counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Counters {
    values: BTreeMap<String, u64>,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `value` to the named counter
    pub fn inc(&mut self, name: &str, value: u64) {
        *self.values.entry(name.to_string()).or_insert(0) += value;
    }

    /// Current value, zero if never incremented
    pub fn get(&self, name: &str) -> u64 {
        self.values.get(name).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Emit every counter at info level
    pub fn log(&self) {
        for (name, value) in self.iter() {
            tracing::info!(counter = name, value, "run counter");
        }
    }
}
