//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Leakwatch - Find the small recurring charges that add up
#[derive(Parser)]
#[command(name = "leakwatch")]
#[command(about = "Recurring micro-spend (leaky bucket) detector", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Detector config file (TOML)
    ///
    /// Defaults to ~/.local/share/leakwatch/config/detector.toml if present,
    /// then built-in defaults. LEAKWATCH_* environment variables override
    /// either.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Detect leaky buckets in a transaction file
    Detect {
        /// CSV or JSON transaction file
        #[arg(short, long)]
        file: PathBuf,

        /// Input format: csv, json (detected from extension if not specified)
        #[arg(long)]
        format: Option<String>,

        /// Minimum occurrences before a merchant is considered
        #[arg(long)]
        min_occurrences: Option<usize>,

        /// Largest average charge that still counts as micro-spend
        #[arg(long)]
        max_amount: Option<f64>,

        /// Minimum confidence score (0.0 - 1.0)
        #[arg(long)]
        min_confidence: Option<f64>,

        /// Days of history to analyze, ending at --as-of
        #[arg(long)]
        window_days: Option<u32>,

        /// End of the analysis window (defaults to the latest transaction)
        #[arg(long)]
        as_of: Option<String>,

        /// Flip amount signs (for exports where expenses are negative)
        #[arg(long)]
        negate: bool,

        /// Show at most this many buckets
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Refine results with the AI backend from AI_BACKEND / OLLAMA_HOST
        #[arg(long)]
        ai: bool,
    },

    /// Show the grouping key for merchant names
    Normalize {
        /// Raw merchant strings as they appear on a statement
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Print the effective detector configuration as TOML
    Config,
}
