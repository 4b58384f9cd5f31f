// Command trait - Defines the interface for all command implementations
// Copyright (C) 2025 Marc Rivero (@seifreed)
// Licensed under GPL-3.0

use crate::Result;
use async_trait::async_trait;

/// Command trait - one job of the certwarden binary
///
/// Each command loads what it needs from the parsed arguments, runs its job
/// to completion and prints a single summary line.
#[async_trait]
pub trait Command: Send + Sync {
    /// Execute the command asynchronously
    ///
    /// # Returns
    /// - `Ok(())` if every item was processed
    /// - `Err(anyhow::Error)` on a fatal error, or wrapping
    ///   `WardenError::PartialFailure` when some items failed
    async fn execute(&self) -> Result<()>;

    /// Get a human-readable name for this command (for logging/debugging)
    fn name(&self) -> &'static str;
}
