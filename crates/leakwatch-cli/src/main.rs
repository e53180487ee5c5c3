//! Leakwatch CLI - Recurring micro-spend detector
//!
//! Usage:
//!   leakwatch detect --file tx.csv    Find leaky buckets in a transaction export
//!   leakwatch normalize "UBER #551"   Show merchant grouping keys
//!   leakwatch config                  Print effective detector configuration

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Detect {
            file,
            format,
            min_occurrences,
            max_amount,
            min_confidence,
            window_days,
            as_of,
            negate,
            limit,
            json,
            ai,
        } => {
            let opts = commands::DetectOptions {
                file,
                format,
                min_occurrences,
                max_amount,
                min_confidence,
                window_days,
                as_of,
                negate,
                limit,
                json,
                ai,
            };
            commands::cmd_detect(config_path, &opts).await
        }
        Commands::Normalize { names } => commands::cmd_normalize(&names),
        Commands::Config => commands::cmd_config(config_path),
    }
}
