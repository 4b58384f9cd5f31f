// certwarden - name-set backfill and certificate expiration notices
// Copyright (C) 2025 Marc Rivero (@seifreed)
// Licensed under GPL-3.0
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, version 3.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.

use anyhow::Result;
use certwarden::commands::CommandRouter;
use certwarden::{Args, WardenConfig};
use clap::Parser;
use colored::Colorize;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging - respect RUST_LOG environment variable
    let log_level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|s| s.parse::<Level>().ok())
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Parse command line arguments
    let args = Args::parse();
    args.validate()?;

    // Handle --config-example (generate example config and exit)
    if let Some(config_path) = &args.config_example {
        WardenConfig::create_example_config(config_path)?;
        println!(
            "{} Example configuration saved to: {}",
            "✓".green(),
            config_path.display()
        );
        return Ok(());
    }

    let command = CommandRouter::route(args)?;
    info!("Running {}", command.name());

    if let Err(e) = command.execute().await {
        eprintln!("{} {:#}", "✗".red(), e);
        std::process::exit(1);
    }

    Ok(())
}
