// BackfillCommand - Name-set backfill over the certificate store
// Copyright (C) 2025 Marc Rivero (@seifreed)
// Licensed under GPL-3.0

use super::{Command, export_report, shutdown_flag, summary_line};
use crate::backfill::{BackfillReconciler, BackfillState};
use crate::db::WardenDatabase;
use crate::error::WardenError;
use crate::stats::Counters;
use crate::{Args, Result};
use async_trait::async_trait;
use tracing::info;

/// BackfillCommand writes the missing name-set rows
///
/// Runs the reconciler until the store is covered, the run is cancelled, or
/// the store stops answering queries.
pub struct BackfillCommand {
    args: Args,
}

impl BackfillCommand {
    /// Create a new BackfillCommand with the given arguments
    pub fn new(args: Args) -> Self {
        Self { args }
    }
}

#[async_trait]
impl Command for BackfillCommand {
    async fn execute(&self) -> Result<()> {
        let config = self.args.load_config()?;
        let db = WardenDatabase::new(&config.database).await?;

        let mut reconciler = BackfillReconciler::new(db.repository(), config.backfill_settings())
            .with_running(shutdown_flag());
        if let Some(now) = self.args.reference_time()? {
            reconciler = reconciler.with_now(now);
        }

        info!("Backfilling name sets as of {}", reconciler.as_of());
        let mut counters = Counters::new();
        let result = reconciler.run(&mut counters).await;
        db.close().await;

        let report = result?;
        counters.log();
        if let Some(path) = &self.args.json {
            export_report(&report, path)?;
        }
        println!("{}", summary_line("backfill", report.found, report.failed));

        if let Some(failure) = report.failure_summary() {
            return Err(failure.into());
        }
        if report.state == BackfillState::Cancelled {
            return Err(WardenError::Cancelled.into());
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "BackfillCommand"
    }
}
