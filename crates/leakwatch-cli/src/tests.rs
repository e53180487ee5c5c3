//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::io::Write;
use std::path::PathBuf;

use chrono::{TimeZone, Utc};
use clap::Parser;
use leakwatch_core::ai::AIClient;
use leakwatch_core::{Frequency, MockBackend};
use tempfile::NamedTempFile;

use crate::cli::{Cli, Commands};
use crate::commands::{self, truncate, DetectOptions};

/// Config file pinned to the built-in defaults so tests ignore the host's
/// data dir override
fn default_config_file() -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "minimum_occurrences = 4").unwrap();
    writeln!(file, "analysis_window_days = 90").unwrap();
    writeln!(file, "max_amount_for_micro_spend = 50.0").unwrap();
    writeln!(file, "min_confidence_threshold = 0.6").unwrap();
    file.flush().unwrap();
    file
}

/// Weekly coffee, a monthly subscription and an old habit outside the
/// default window
fn transactions_csv() -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    writeln!(file, "date,merchant,amount,category").unwrap();
    for day in [1, 8, 15, 22, 29] {
        writeln!(file, "2024-03-{:02},Starbucks #102,5.50,Coffee Shops", day).unwrap();
    }
    for month in [1, 2, 3] {
        writeln!(file, "2024-{:02}-05,Netflix,15.49,Streaming", month).unwrap();
    }
    // Six months before the coffee run
    for day in [1, 3, 5, 7, 9] {
        writeln!(file, "2023-09-{:02},Bagel Shop,4.00,Food", day).unwrap();
    }
    file.flush().unwrap();
    file
}

/// JSON export with real times of day
fn transactions_json(rows: &[&str]) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    writeln!(file, "[{}]", rows.join(",")).unwrap();
    file.flush().unwrap();
    file
}

fn options(file: PathBuf) -> DetectOptions {
    DetectOptions {
        file,
        ..Default::default()
    }
}

// ========== Helper Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("Starbucks", 20), "Starbucks");
    assert_eq!(truncate("A very long merchant name", 10), "A very ...");
    assert_eq!(truncate("☕☕☕☕☕☕☕☕", 5), "☕☕...");
}

#[test]
fn test_normalize_names() {
    let pairs = commands::normalize_names(&["Uber #551 - NY".to_string(), "UBER STORE 9".to_string()]);
    assert_eq!(pairs[0].1, "uber");
    assert_eq!(pairs[1].1, "uber");
    assert!(commands::cmd_normalize(&["Netflix".to_string()]).is_ok());
}

#[test]
fn test_apply_flags_overrides_and_validates() {
    let opts = DetectOptions {
        min_occurrences: Some(6),
        max_amount: Some(20.0),
        ..Default::default()
    };
    let config = commands::apply_flags(Default::default(), &opts).unwrap();
    assert_eq!(config.minimum_occurrences, 6);
    assert_eq!(config.max_amount_for_micro_spend, 20.0);
    assert_eq!(config.min_confidence_threshold, 0.6);

    let bad = DetectOptions {
        min_confidence: Some(1.5),
        ..Default::default()
    };
    assert!(commands::apply_flags(Default::default(), &bad).is_err());
}

#[test]
fn test_cmd_config_with_file() {
    let config = default_config_file();
    assert!(commands::cmd_config(Some(config.path())).is_ok());
}

#[test]
fn test_cmd_config_missing_file() {
    let err = commands::cmd_config(Some(std::path::Path::new("/nonexistent/detector.toml")))
        .unwrap_err();
    assert!(err.to_string().contains("Failed to load config"));
}

// ========== Detect Command Tests ==========

#[tokio::test]
async fn test_run_detect_finds_coffee_habit() {
    let config = default_config_file();
    let csv = transactions_csv();

    let report = commands::run_detect(Some(config.path()), &options(csv.path().to_path_buf()), None)
        .await
        .unwrap();

    assert_eq!(report.transactions_loaded, 13);
    // Bagel Shop falls outside the 90 days ending 2024-03-29
    assert_eq!(report.transactions_in_window, 8);
    assert_eq!(report.buckets.len(), 1);
    assert_eq!(report.buckets[0].merchant_name, "Starbucks #102");
    assert_eq!(report.buckets[0].frequency, Frequency::Weekly);
    assert!(report.ai_backend.is_none());
}

#[tokio::test]
async fn test_run_detect_as_of_moves_window() {
    let config = default_config_file();
    let csv = transactions_csv();
    let opts = DetectOptions {
        as_of: Some("2023-09-30".to_string()),
        ..options(csv.path().to_path_buf())
    };

    let report = commands::run_detect(Some(config.path()), &opts, None).await.unwrap();

    assert_eq!(report.buckets.len(), 1);
    assert_eq!(report.buckets[0].merchant_name, "Bagel Shop");
}

#[tokio::test]
async fn test_run_detect_flags_tighten_results() {
    let config = default_config_file();
    let csv = transactions_csv();
    let opts = DetectOptions {
        min_occurrences: Some(6),
        ..options(csv.path().to_path_buf())
    };

    let report = commands::run_detect(Some(config.path()), &opts, None).await.unwrap();
    assert!(report.buckets.is_empty());
}

#[tokio::test]
async fn test_run_detect_json_report() {
    let config = default_config_file();
    let csv = transactions_csv();
    let report = commands::run_detect(Some(config.path()), &options(csv.path().to_path_buf()), None)
        .await
        .unwrap();

    let json = commands::report_json(&report);
    assert_eq!(json["summary"]["bucket_count"], 1);
    assert_eq!(json["buckets"][0]["frequency"], "weekly");
    assert_eq!(json["config"]["minimum_occurrences"], 4);
}

#[tokio::test]
async fn test_run_detect_unknown_format() {
    let config = default_config_file();
    let csv = transactions_csv();
    let opts = DetectOptions {
        format: Some("xlsx".to_string()),
        ..options(csv.path().to_path_buf())
    };

    assert!(commands::run_detect(Some(config.path()), &opts, None).await.is_err());
}

#[tokio::test]
async fn test_run_detect_missing_file() {
    let config = default_config_file();
    let err = commands::run_detect(
        Some(config.path()),
        &options(PathBuf::from("/nonexistent/tx.csv")),
        None,
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("Failed to load transactions"));
}

#[tokio::test]
async fn test_cmd_detect_prints() {
    let config = default_config_file();
    let csv = transactions_csv();
    let opts = DetectOptions {
        limit: Some(1),
        ..options(csv.path().to_path_buf())
    };
    assert!(commands::cmd_detect(Some(config.path()), &opts).await.is_ok());

    let json_opts = DetectOptions { json: true, ..opts };
    assert!(commands::cmd_detect(Some(config.path()), &json_opts).await.is_ok());
}

#[test]
fn test_parse_as_of_covers_whole_day() {
    let end = commands::parse_as_of("2024-03-31").unwrap();
    assert_eq!(end.date_naive().to_string(), "2024-03-31");
    assert!(end > Utc.with_ymd_and_hms(2024, 3, 31, 23, 59, 59).unwrap());
    assert!(end < Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap());

    let exact = commands::parse_as_of("2024-03-31T12:00:00Z").unwrap();
    assert_eq!(exact, Utc.with_ymd_and_hms(2024, 3, 31, 12, 0, 0).unwrap());

    assert!(commands::parse_as_of("yesterday").is_err());
}

#[tokio::test]
async fn test_run_detect_as_of_keeps_same_day_charges() {
    let config = default_config_file();
    let rows: Vec<String> = [3, 10, 17, 24, 31]
        .iter()
        .map(|d| {
            format!(
                r#"{{"date": "2024-03-{:02}T09:00:00Z", "merchant": "Uber", "amount": 12.0}}"#,
                d
            )
        })
        .collect();
    let rows: Vec<&str> = rows.iter().map(String::as_str).collect();
    let json = transactions_json(&rows);
    let opts = DetectOptions {
        as_of: Some("2024-03-31".to_string()),
        ..options(json.path().to_path_buf())
    };

    let report = commands::run_detect(Some(config.path()), &opts, None).await.unwrap();

    assert_eq!(report.transactions_in_window, 5);
    assert_eq!(report.buckets.len(), 1);
    assert_eq!(report.buckets[0].occurrence_count, 5);
    assert_eq!(
        report.buckets[0].last_occurrence,
        Utc.with_ymd_and_hms(2024, 3, 31, 9, 0, 0).unwrap()
    );
}

#[tokio::test]
async fn test_run_detect_window_ignores_ineligible_rows() {
    let config = default_config_file();
    let mut rows: Vec<String> = [1, 8, 15, 22, 29]
        .iter()
        .map(|d| {
            format!(
                r#"{{"date": "2024-03-{:02}T08:00:00Z", "merchant": "Starbucks", "amount": 5.5}}"#,
                d
            )
        })
        .collect();
    // A far-future pending charge and a later refund
    rows.push(
        r#"{"date": "2024-09-01T08:00:00Z", "merchant": "Starbucks", "amount": 5.5, "is_pending": true}"#
            .to_string(),
    );
    rows.push(r#"{"date": "2024-10-01T08:00:00Z", "merchant": "Payroll", "amount": -900.0}"#.to_string());
    let rows: Vec<&str> = rows.iter().map(String::as_str).collect();
    let json = transactions_json(&rows);

    let report = commands::run_detect(Some(config.path()), &options(json.path().to_path_buf()), None)
        .await
        .unwrap();

    assert_eq!(report.as_of, Some(Utc.with_ymd_and_hms(2024, 3, 29, 8, 0, 0).unwrap()));
    assert_eq!(report.buckets.len(), 1);
    assert_eq!(report.buckets[0].occurrence_count, 5);
}

// ========== AI Fallback Tests ==========

#[tokio::test]
async fn test_run_detect_unhealthy_backend_falls_back() {
    let config = default_config_file();
    let csv = transactions_csv();
    let opts = DetectOptions {
        ai: true,
        ..options(csv.path().to_path_buf())
    };

    let plain = commands::run_detect(Some(config.path()), &options(csv.path().to_path_buf()), None)
        .await
        .unwrap();
    let report = commands::run_detect(
        Some(config.path()),
        &opts,
        Some(AIClient::Mock(MockBackend::unhealthy())),
    )
    .await
    .unwrap();

    assert!(report.ai_backend.is_none());
    assert_eq!(report.buckets, plain.buckets);
    assert!(report.buckets.iter().all(|b| b.ai_classification.is_none()));
}

#[tokio::test]
async fn test_run_detect_ai_without_backend_falls_back() {
    let config = default_config_file();
    let csv = transactions_csv();
    let opts = DetectOptions {
        ai: true,
        ..options(csv.path().to_path_buf())
    };

    let plain = commands::run_detect(Some(config.path()), &options(csv.path().to_path_buf()), None)
        .await
        .unwrap();
    let report = commands::run_detect(Some(config.path()), &opts, None).await.unwrap();

    assert!(report.ai_backend.is_none());
    assert_eq!(report.buckets, plain.buckets);
}

#[tokio::test]
async fn test_run_detect_healthy_backend_enriches() {
    let config = default_config_file();
    let csv = transactions_csv();
    let opts = DetectOptions {
        ai: true,
        ..options(csv.path().to_path_buf())
    };

    let report = commands::run_detect(Some(config.path()), &opts, Some(AIClient::mock()))
        .await
        .unwrap();

    assert_eq!(report.ai_backend, Some("mock"));
    assert_eq!(report.buckets.len(), 1);
    assert_eq!(report.buckets[0].merchant_name, "Starbucks #102");
    assert!(report.buckets[0]
        .ai_classification
        .as_ref()
        .is_some_and(|c| c.is_discretionary));
}

// ========== Argument Parsing Tests ==========

#[test]
fn test_parse_detect_args() {
    let cli = Cli::try_parse_from([
        "leakwatch",
        "detect",
        "--file",
        "tx.csv",
        "--max-amount",
        "25",
        "--as-of",
        "2024-03-31",
        "--json",
        "-v",
    ])
    .unwrap();

    assert!(cli.verbose);
    match cli.command {
        Commands::Detect {
            file,
            max_amount,
            as_of,
            json,
            ai,
            ..
        } => {
            assert_eq!(file, PathBuf::from("tx.csv"));
            assert_eq!(max_amount, Some(25.0));
            assert_eq!(as_of.as_deref(), Some("2024-03-31"));
            assert!(json);
            assert!(!ai);
        }
        _ => panic!("expected detect command"),
    }
}

#[test]
fn test_parse_global_config_flag() {
    let cli = Cli::try_parse_from(["leakwatch", "config", "--config", "my.toml"]).unwrap();
    assert_eq!(cli.config, Some(PathBuf::from("my.toml")));
    assert!(matches!(cli.command, Commands::Config));
}

#[test]
fn test_normalize_requires_names() {
    assert!(Cli::try_parse_from(["leakwatch", "normalize"]).is_err());
}
