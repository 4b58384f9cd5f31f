// Commands module - Command Pattern implementation
// Copyright (C) 2025 Marc Rivero (@seifreed)
// Licensed under GPL-3.0

mod command;
mod router;

// Individual command implementations
mod backfill;
mod mailer;

pub use command::Command;
pub use router::CommandRouter;

// Re-export individual commands for testing purposes
pub use backfill::BackfillCommand;
pub use mailer::MailerCommand;

use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// One-line run summary printed by every command
pub fn summary_line(command: &str, processed: usize, failed: usize) -> String {
    format!("{}: processed {}, failed {}", command, processed, failed)
}

/// Write a run report to `path` as pretty-printed JSON
pub fn export_report<T: Serialize>(report: &T, path: &Path) -> crate::Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;
    tracing::info!("Report exported to JSON: {}", path.display());
    Ok(())
}

/// Cancellation flag cleared by SIGTERM/SIGINT (Ctrl+C elsewhere)
pub fn shutdown_flag() -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);

    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            let (mut sigterm, mut sigint) =
                match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                    (Ok(term), Ok(int)) => (term, int),
                    (Err(e), _) | (_, Err(e)) => {
                        tracing::warn!("Failed to install signal handlers: {}", e);
                        return;
                    }
                };

            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, stopping after the current batch");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT, stopping after the current batch");
                }
            }

            flag.store(false, Ordering::SeqCst);
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to install Ctrl+C handler: {}", e);
                return;
            }

            tracing::info!("Received Ctrl+C, stopping after the current batch");
            flag.store(false, Ordering::SeqCst);
        }
    });

    running
}
