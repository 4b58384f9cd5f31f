// certwarden - name-set backfill and certificate expiration notices
// Copyright (C) 2025 Marc Rivero (@seifreed)
// Licensed under GPL-3.0

//! certwarden keeps an issued-certificate store consistent with its derived
//! indexes. It backfills the canonical name-set record every certificate needs
//! for renewal detection, and it sends one expiration notice per domain cluster
//! to every contact owning certificates that are about to expire.

pub mod backfill;
pub mod certificates;
pub mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod expiration;
pub mod notify;
pub mod stats;

// Re-export commonly used types
pub use crate::backfill::{BackfillReconciler, BackfillReport, BackfillState};
pub use crate::cli::Args;
pub use crate::config::WardenConfig;
pub use crate::error::WardenError;
pub use crate::expiration::{ExpirationAggregator, ExpirationMailer, ExpirationNotice};
pub use crate::stats::Counters;

/// Result type for certwarden operations
pub type Result<T> = anyhow::Result<T>;

/// Error type for certwarden operations
pub use anyhow::Error;
