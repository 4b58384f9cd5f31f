// CLI module - Command line interface and argument parsing
// Copyright (C) 2025 Marc Rivero (@seifreed)
// Licensed under GPL-3.0

use crate::config::WardenConfig;
use crate::error::WardenError;
use chrono::{DateTime, Utc};
use clap::Parser;
use std::path::PathBuf;

// Sub-modules for organized CLI arguments
mod backfill_args;
mod mailer_args;

// Re-export sub-structs
pub use backfill_args::BackfillArgs;
pub use mailer_args::MailerArgs;

/// Configuration file used when `--config` is not given
pub const DEFAULT_CONFIG_PATH: &str = "certwarden.toml";

/// certwarden - name-set backfill and certificate expiration notices
///
/// Each invocation runs one job, `--backfill` or `--mail`, against the store
/// described by the configuration file.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, long_about = None)]
#[command(name = "certwarden")]
#[command(about = "Name-set backfill and certificate expiration notices", long_about = None)]
pub struct Args {
    /// Configuration file (TOML format)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Generate example configuration file
    #[arg(long = "config-example", value_name = "FILE")]
    pub config_example: Option<PathBuf>,

    /// Reference time instead of the current clock (RFC 3339)
    #[arg(long = "now", value_name = "RFC3339")]
    pub now: Option<String>,

    /// Write the run report as JSON
    #[arg(long = "json", value_name = "FILE")]
    pub json: Option<PathBuf>,

    // ============ Name-Set Backfill ============
    #[command(flatten)]
    pub backfill: BackfillArgs,

    // ============ Expiration Mailer ============
    #[command(flatten)]
    pub mailer: MailerArgs,
}

impl Args {
    /// Validate CLI arguments for mutual exclusivity and logical consistency
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.backfill.enable && self.mailer.enable {
            anyhow::bail!("Cannot use --backfill and --mail together. Choose one job.");
        }

        if self.backfill.batch_size == Some(0) {
            anyhow::bail!("--batch-size must be positive");
        }

        self.reference_time()?;
        Ok(())
    }

    /// Parsed `--now`, if given
    pub fn reference_time(&self) -> crate::Result<Option<DateTime<Utc>>> {
        let Some(raw) = &self.now else {
            return Ok(None);
        };

        let parsed = DateTime::parse_from_rfc3339(raw).map_err(|e| WardenError::Config {
            message: format!("Invalid --now value {:?}: {}", raw, e),
        })?;
        Ok(Some(parsed.with_timezone(&Utc)))
    }

    /// Configuration file path, falling back to `certwarden.toml`
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Load the configuration file and apply command-line overrides
    pub fn load_config(&self) -> crate::Result<WardenConfig> {
        let mut config = WardenConfig::from_file(self.config_path())?;
        self.apply_overrides(&mut config);
        Ok(config)
    }

    /// Flags take precedence over the configuration file
    pub fn apply_overrides(&self, config: &mut WardenConfig) {
        if let Some(batch_size) = self.backfill.batch_size {
            config.backfill.batch_size = batch_size;
        }
        if let Some(days) = self.backfill.lookback_days {
            config.backfill.lookback_days = Some(days);
        }
        if self.mailer.dry_run {
            config.mailer.dry_run = true;
        }
    }
}
