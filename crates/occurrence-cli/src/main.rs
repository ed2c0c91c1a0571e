//! `famcal` -- render household task calendars from a document snapshot.
//!
//! # Usage
//!
//! ```bash
//! # This week, household timezone
//! famcal --input household.json week
//!
//! # March 2024 in a 6-week grid, only school tasks, high priority first
//! famcal --input household.json --tags school --sort high month --month 2024-03
//!
//! # Free slots for a day
//! famcal --input household.json timeline --date 2024-03-05
//!
//! # Save a named range and render it later
//! famcal --input household.json ranges save holidays 2024-07-01 2024-07-14
//! famcal --input household.json custom --range holidays
//! ```

mod commands;
mod config;
mod store;

use clap::Parser;

use commands::Cli;
use config::FamcalConfig;

fn main() {
    let cli = Cli::parse();

    let config = match FamcalConfig::load(&cli.global) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    // stdout carries the JSON output; logs go to stderr.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let output = commands::run(&cli, config).and_then(|value| {
        serde_json::to_string_pretty(&value).map_err(anyhow::Error::from)
    });

    match output {
        Ok(json) => println!("{json}"),
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}
