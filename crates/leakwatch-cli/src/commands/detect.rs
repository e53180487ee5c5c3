//! Leak detection command

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use leakwatch_core::ai::{AIBackend, AIClient, Enricher};
use leakwatch_core::detect::filter_eligible;
use leakwatch_core::import::parse_date;
use leakwatch_core::{
    load_transactions, within_window, DetectionSummary, DetectorConfig, FileFormat, LeakDetector,
    LeakyBucket, Transaction,
};
use tracing::{info, warn};

use super::config::load_config;
use super::truncate;

/// Options for `leakwatch detect`
#[derive(Debug, Clone, Default)]
pub struct DetectOptions {
    pub file: PathBuf,
    pub format: Option<String>,
    pub min_occurrences: Option<usize>,
    pub max_amount: Option<f64>,
    pub min_confidence: Option<f64>,
    pub window_days: Option<u32>,
    pub as_of: Option<String>,
    pub negate: bool,
    pub limit: Option<usize>,
    pub json: bool,
    pub ai: bool,
}

/// What a detection run produced, before printing
#[derive(Debug)]
pub struct DetectReport {
    pub config: DetectorConfig,
    pub transactions_loaded: usize,
    pub transactions_in_window: usize,
    pub as_of: Option<DateTime<Utc>>,
    pub buckets: Vec<LeakyBucket>,
    pub ai_backend: Option<&'static str>,
}

/// Layer command-line flags over the loaded config
pub fn apply_flags(mut config: DetectorConfig, opts: &DetectOptions) -> Result<DetectorConfig> {
    if let Some(n) = opts.min_occurrences {
        config = config.with_minimum_occurrences(n);
    }
    if let Some(x) = opts.max_amount {
        config = config.with_max_amount(x);
    }
    if let Some(c) = opts.min_confidence {
        config = config.with_min_confidence(c);
    }
    if let Some(d) = opts.window_days {
        config = config.with_analysis_window_days(d);
    }
    config.validate()?;
    Ok(config)
}

/// Newest eligible charge, so pending or refunded rows can't move the window
fn latest_timestamp(transactions: &[Transaction]) -> Option<DateTime<Utc>> {
    filter_eligible(transactions).iter().map(|t| t.date).max()
}

/// Parse `--as-of`; a bare date covers that whole day
pub fn parse_as_of(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d") {
        let end_of_day = date
            .and_hms_nano_opt(23, 59, 59, 999_999_999)
            .context("Invalid --as-of date")?;
        return Ok(Utc.from_utc_datetime(&end_of_day));
    }
    parse_date(s).context("Invalid --as-of date")
}

/// Load, window, detect and optionally enrich
///
/// `client` is only used when it passes a health check; otherwise the
/// report is plain detection.
pub async fn run_detect(
    config_path: Option<&Path>,
    opts: &DetectOptions,
    client: Option<AIClient>,
) -> Result<DetectReport> {
    let config = apply_flags(load_config(config_path)?, opts)?;

    let format = opts
        .format
        .as_deref()
        .map(str::parse::<FileFormat>)
        .transpose()?;
    let transactions = load_transactions(&opts.file, format, opts.negate)
        .with_context(|| format!("Failed to load transactions from {}", opts.file.display()))?;

    let as_of = match opts.as_of.as_deref() {
        Some(s) => Some(parse_as_of(s)?),
        None => latest_timestamp(&transactions),
    };
    let windowed = match as_of {
        Some(end) => within_window(&transactions, end, config.analysis_window_days),
        None => Vec::new(),
    };
    info!(
        "Analyzing {} of {} transactions ({} day window)",
        windowed.len(),
        transactions.len(),
        config.analysis_window_days
    );

    let detector = LeakDetector::new(config.clone());
    let mut ai_backend = None;

    let mut buckets = match client {
        Some(client) => {
            if client.health_check().await {
                info!("AI enrichment via {} ({})", client.backend_name(), client.host());
                ai_backend = Some(client.backend_name());
                Enricher::new()
                    .with_backend(&client)
                    .run(&detector, &windowed)
                    .await
                    .buckets
            } else {
                warn!(
                    "AI backend at {} is not responding, using built-in detection",
                    client.host()
                );
                detector.detect(&windowed)
            }
        }
        None => {
            if opts.ai {
                warn!("--ai given but no AI backend configured (set OLLAMA_HOST or AI_BACKEND=mock)");
            }
            detector.detect(&windowed)
        }
    };

    if let Some(limit) = opts.limit {
        buckets.truncate(limit);
    }

    Ok(DetectReport {
        config,
        transactions_loaded: transactions.len(),
        transactions_in_window: windowed.len(),
        as_of,
        buckets,
        ai_backend,
    })
}

pub async fn cmd_detect(config_path: Option<&Path>, opts: &DetectOptions) -> Result<()> {
    let client = if opts.ai { AIClient::from_env() } else { None };
    let report = run_detect(config_path, opts, client).await?;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&report_json(&report))?);
    } else {
        print_report(&report);
    }

    Ok(())
}

pub fn report_json(report: &DetectReport) -> serde_json::Value {
    serde_json::json!({
        "as_of": report.as_of,
        "transactions_loaded": report.transactions_loaded,
        "transactions_in_window": report.transactions_in_window,
        "config": report.config,
        "summary": DetectionSummary::from_buckets(&report.buckets),
        "buckets": report.buckets,
    })
}

fn print_report(report: &DetectReport) {
    println!("🔍 Leaky bucket detection");
    println!(
        "   {} transactions loaded, {} in the last {} days",
        report.transactions_loaded, report.transactions_in_window, report.config.analysis_window_days
    );
    if let Some(backend) = report.ai_backend {
        println!("   🤖 AI enrichment: {}", backend);
    }
    println!();

    if report.buckets.is_empty() {
        println!("✅ No leaky buckets found. Your small spending looks intentional!");
        return;
    }

    println!(
        "{:<28} {:<13} {:>5} {:>9} {:>10} {:>6}",
        "Merchant", "Frequency", "Count", "Avg", "Monthly", "Conf"
    );
    println!("{}", "-".repeat(76));

    for bucket in &report.buckets {
        println!(
            "{:<28} {:<13} {:>5} {:>9} {:>10} {:>5.0}%",
            truncate(&bucket.merchant_name, 28),
            bucket.frequency.as_str(),
            bucket.occurrence_count,
            format!("${:.2}", bucket.average_amount),
            format!("${:.2}", bucket.monthly_impact),
            bucket.adjusted_confidence() * 100.0
        );
        if let Some(c) = &bucket.ai_classification {
            if !c.reasoning.is_empty() {
                println!("   └─ {}", c.reasoning);
            }
        }
    }

    let summary = DetectionSummary::from_buckets(&report.buckets);
    println!();
    println!("📊 Summary");
    println!("   ─────────────────────────────");
    println!("   Leaky buckets: {}", summary.bucket_count);
    println!("   Monthly impact: ${:.2}", summary.total_monthly_impact);
    println!("   Yearly impact:  ${:.2}", summary.total_yearly_impact);
    for total in &summary.by_category {
        println!(
            "   {:<14} ${:>8.2}/mo ({})",
            total.category.as_str(),
            total.monthly_impact,
            total.bucket_count
        );
    }
}
