// Expiration mailer arguments
// Copyright (C) 2025 Marc Rivero (@seifreed)
// Licensed under GPL-3.0

use clap::Args;

/// Expiration notice options
#[derive(Args, Debug, Clone, Default)]
pub struct MailerArgs {
    /// Send expiration notices
    #[arg(long = "mail", id = "mail_enable")]
    pub enable: bool,

    /// Log notices instead of sending them
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}
