// Name-set backfill arguments
// Copyright (C) 2025 Marc Rivero (@seifreed)
// Licensed under GPL-3.0

use clap::Args;

/// Name-set backfill options
///
/// Values given here override the `[backfill]` section of the configuration file.
#[derive(Args, Debug, Clone, Default)]
pub struct BackfillArgs {
    /// Backfill missing name-set rows
    #[arg(long = "backfill", id = "backfill_enable")]
    pub enable: bool,

    /// Uncovered certificates fetched per query
    #[arg(long = "batch-size", value_name = "COUNT")]
    pub batch_size: Option<usize>,

    /// Only backfill certificates issued in the last N days
    #[arg(long = "lookback-days", value_name = "DAYS")]
    pub lookback_days: Option<u32>,
}
