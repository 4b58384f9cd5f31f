// CommandRouter - Routes CLI arguments to appropriate Command
// Copyright (C) 2025 Marc Rivero (@seifreed)
// Licensed under GPL-3.0

use super::{BackfillCommand, Command, MailerCommand};
use crate::error::WardenError;
use crate::{Args, Result};

/// CommandRouter determines which Command to execute based on CLI arguments
///
/// Routing order:
/// 1. Name-set backfill (--backfill)
/// 2. Expiration mailer (--mail)
pub struct CommandRouter;

impl CommandRouter {
    /// Route CLI arguments to the appropriate Command
    ///
    /// # Errors
    /// Returns `WardenError::Config` when no job, or more than one, is selected
    pub fn route(args: Args) -> Result<Box<dyn Command>> {
        Self::validate_routing(&args)?;

        if args.backfill.enable {
            return Ok(Box::new(BackfillCommand::new(args)));
        }

        Ok(Box::new(MailerCommand::new(args)))
    }

    /// Check that exactly one job was requested
    pub fn validate_routing(args: &Args) -> Result<()> {
        match (args.backfill.enable, args.mailer.enable) {
            (true, true) => Err(WardenError::Config {
                message: "Cannot combine --backfill and --mail".to_string(),
            }
            .into()),
            (false, false) => Err(WardenError::Config {
                message: "Nothing to do: pass --backfill or --mail".to_string(),
            }
            .into()),
            _ => Ok(()),
        }
    }
}
