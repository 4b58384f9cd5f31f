// Name-Set Backfill
//
// Walks the certificate store in bounded batches and writes the canonical
// name-set row for every unexpired certificate that lacks one. Each batch
// re-queries the "not yet covered" predicate, so an interrupted run resumes
// from wherever the store is, and a rerun over a covered store writes nothing.

use crate::Result;
use crate::certificates::{decode_certificate, hash_names, hex_digest};
use crate::db::models::{NameSetRecord, UncoveredCertificate};
use crate::db::traits::CertificateStore;
use crate::error::WardenError;
use crate::stats::{self, Counters};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Default number of candidates fetched per query
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Reconciler state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackfillState {
    Querying,
    Processing,
    Done,
    Failed,
    Cancelled,
}

impl fmt::Display for BackfillState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackfillState::Querying => "querying",
            BackfillState::Processing => "processing",
            BackfillState::Done => "done",
            BackfillState::Failed => "failed",
            BackfillState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Tunables for one reconciler
#[derive(Debug, Clone)]
pub struct BackfillSettings {
    pub batch_size: usize,
    /// Only consider certificates issued within this long before `as_of`
    pub lookback: Option<Duration>,
}

impl Default for BackfillSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            lookback: None,
        }
    }
}

/// A candidate skipped during this run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub serial: String,
    pub reason: String,
}

/// Outcome of a backfill run
#[derive(Debug, Clone, Serialize)]
pub struct BackfillReport {
    pub state: BackfillState,
    /// Queries that returned work
    pub batches: usize,
    /// Distinct uncovered certificates seen
    pub found: usize,
    pub added: usize,
    pub failed: usize,
    pub failures: Vec<ItemFailure>,
}

impl BackfillReport {
    fn new() -> Self {
        Self {
            state: BackfillState::Querying,
            batches: 0,
            found: 0,
            added: 0,
            failed: 0,
            failures: Vec::new(),
        }
    }

    /// `PartialFailure` when any candidate was skipped
    pub fn failure_summary(&self) -> Option<WardenError> {
        (self.failed > 0).then(|| WardenError::PartialFailure {
            failed: self.failed,
            total: self.found,
        })
    }
}

/// Bounded-batch name-set reconciler
pub struct BackfillReconciler {
    store: Arc<dyn CertificateStore>,
    settings: BackfillSettings,
    now: Option<DateTime<Utc>>,
    running: Arc<AtomicBool>,
}

impl BackfillReconciler {
    pub fn new(store: Arc<dyn CertificateStore>, settings: BackfillSettings) -> Self {
        Self {
            store,
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

    /// Share a cancellation flag; clearing it stops the run before the next query
    pub fn with_running(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = running;
        self
    }

    /// Reference time for the expiry predicate
    pub fn as_of(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }

    /// Run until no uncovered certificate is left.
    ///
    /// Decode and write failures skip the candidate and are reported; a failed
    /// query aborts the run with `WardenError::Query`.
    pub async fn run(&self, counters: &mut Counters) -> Result<BackfillReport> {
        if self.settings.batch_size == 0 {
            return Err(WardenError::Config {
                message: "batch size must be positive".to_string(),
            }
            .into());
        }

        let as_of = self.as_of();
        let issued_after = self.settings.lookback.map(|lookback| as_of - lookback);
        let mut report = BackfillReport::new();
        let mut skipped: HashSet<String> = HashSet::new();

        tracing::info!(
            "Starting name-set backfill (batch size {}, as of {})",
            self.settings.batch_size,
            as_of
        );

        loop {
            if !self.running.load(Ordering::SeqCst) {
                tracing::warn!("Backfill cancelled after {} batches", report.batches);
                report.state = BackfillState::Cancelled;
                break;
            }

            report.state = BackfillState::Querying;
            // over-fetch by the failed serials so they cannot crowd out fresh rows
            let limit = self.settings.batch_size + skipped.len();
            let candidates = match self
                .store
                .find_uncovered(limit, as_of, issued_after)
                .await
            {
                Ok(candidates) => candidates,
                Err(e) => {
                    tracing::error!("Failed to query uncovered certificates: {}", e);
                    report.state = BackfillState::Failed;
                    return Err(e);
                }
            };

            let fresh: Vec<UncoveredCertificate> = candidates
                .into_iter()
                .filter(|c| !skipped.contains(&c.serial))
                .take(self.settings.batch_size)
                .collect();
            if fresh.is_empty() {
                // nothing left, or only rows that already failed this run
                report.state = BackfillState::Done;
                break;
            }
            counters.inc(stats::NAMESET_MISSING_FOUND, fresh.len() as u64);

            report.state = BackfillState::Processing;
            report.batches += 1;
            report.found += fresh.len();
            let batch_size = fresh.len();
            let mut batch_added = 0;

            for candidate in fresh {
                match self.backfill_one(&candidate).await {
                    Ok(()) => {
                        batch_added += 1;
                        counters.inc(stats::NAMESET_ADDED, 1);
                    }
                    Err(e) => {
                        tracing::warn!("Skipping certificate {}: {}", candidate.serial, e);
                        counters.inc(stats::NAMESET_FAILED, 1);
                        report.failures.push(ItemFailure {
                            serial: candidate.serial.clone(),
                            reason: e.to_string(),
                        });
                        skipped.insert(candidate.serial);
                    }
                }
            }

            report.added += batch_added;
            report.failed = report.failures.len();
            tracing::info!(
                "Batch {}: added {} of {} name sets",
                report.batches,
                batch_added,
                batch_size
            );
        }

        tracing::info!(
            "Backfill {}: {} found, {} added, {} failed",
            report.state,
            report.found,
            report.added,
            report.failed
        );
        Ok(report)
    }

    async fn backfill_one(&self, candidate: &UncoveredCertificate) -> Result<()> {
        let decoded = decode_certificate(&candidate.serial, &candidate.der)?;
        let digest = hash_names(&decoded.dns_names);
        let record = NameSetRecord::new(candidate.serial.clone(), digest, candidate.issued);

        self.store.write_name_set(&record).await?;
        tracing::debug!(
            "Wrote name set {} for {}",
            hex_digest(&digest),
            candidate.serial
        );
        Ok(())
    }
}
