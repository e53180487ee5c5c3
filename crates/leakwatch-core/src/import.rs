//! Transaction loading from CSV and JSON exports
//!
//! CSV columns are matched by header name, case-insensitively, so both a
//! plain `date,merchant,amount` file and a bank export such as
//! `Transaction Date,Post Date,Description,Category,Type,Amount` load.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use csv::{ReaderBuilder, StringRecord};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::Transaction;

/// Supported input formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Json,
}

impl FileFormat {
    /// Guess the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        ext.parse().ok()
    }
}

impl FromStr for FileFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(FileFormat::Csv),
            "json" => Ok(FileFormat::Json),
            other => Err(Error::Import(format!("Unknown file format: {}", other))),
        }
    }
}

const DATE_HEADERS: &[&str] = &["date", "transaction date", "posted date", "post date"];
const MERCHANT_HEADERS: &[&str] = &["merchant", "description", "name", "payee"];
const AMOUNT_HEADERS: &[&str] = &["amount"];
const CATEGORY_HEADERS: &[&str] = &["category"];
const PENDING_HEADERS: &[&str] = &["pending", "is_pending"];
const EXCLUDED_HEADERS: &[&str] = &["excluded", "is_excluded"];
const ICON_HEADERS: &[&str] = &["icon", "logo", "logo_url"];
const ID_HEADERS: &[&str] = &["id", "transaction_id"];

/// Column positions resolved from the header row
#[derive(Debug)]
struct Columns {
    date: usize,
    merchant: usize,
    amount: usize,
    category: Option<usize>,
    pending: Option<usize>,
    excluded: Option<usize>,
    icon: Option<usize>,
    id: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |names: &[&str]| {
            // Earlier aliases win, so "Transaction Date" beats "Post Date"
            names.iter().find_map(|name| {
                headers
                    .iter()
                    .position(|h| h.trim().eq_ignore_ascii_case(name))
            })
        };
        let require = |names: &[&str]| {
            find(names).ok_or_else(|| {
                Error::Import(format!("Missing required column: {}", names[0]))
            })
        };

        Ok(Self {
            date: require(DATE_HEADERS)?,
            merchant: require(MERCHANT_HEADERS)?,
            amount: require(AMOUNT_HEADERS)?,
            category: find(CATEGORY_HEADERS),
            pending: find(PENDING_HEADERS),
            excluded: find(EXCLUDED_HEADERS),
            icon: find(ICON_HEADERS),
            id: find(ID_HEADERS),
        })
    }
}

/// Non-empty trimmed field at an optional column
fn optional_field(record: &StringRecord, column: Option<usize>) -> Option<String> {
    column
        .and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn required_field<'r>(record: &'r StringRecord, column: usize, name: &str, line: usize) -> Result<&'r str> {
    record
        .get(column)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::Import(format!("Row {}: missing {}", line, name)))
}

/// Parse CSV transactions
pub fn parse_csv<R: Read>(reader: R) -> Result<Vec<Transaction>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let columns = Columns::from_headers(rdr.headers()?)?;
    let mut transactions = Vec::new();

    for (index, result) in rdr.records().enumerate() {
        let record = result?;
        // Header is line 1
        let line = index + 2;

        let date = parse_date(required_field(&record, columns.date, "date", line)?)?;
        let merchant = required_field(&record, columns.merchant, "merchant", line)?.to_string();
        let amount = parse_amount(required_field(&record, columns.amount, "amount", line)?)?;

        let is_pending = optional_field(&record, columns.pending)
            .map(|s| parse_bool(&s))
            .transpose()?
            .unwrap_or(false);
        let is_excluded = optional_field(&record, columns.excluded)
            .map(|s| parse_bool(&s))
            .transpose()?
            .unwrap_or(false);

        transactions.push(Transaction {
            id: optional_field(&record, columns.id),
            date,
            merchant,
            amount,
            category: optional_field(&record, columns.category),
            is_pending,
            is_excluded,
            icon: optional_field(&record, columns.icon),
        });
    }

    debug!("Parsed {} CSV transactions", transactions.len());
    Ok(transactions)
}

/// Parse a JSON array of transactions
pub fn parse_json<R: Read>(reader: R) -> Result<Vec<Transaction>> {
    let transactions: Vec<Transaction> = serde_json::from_reader(reader)?;
    debug!("Parsed {} JSON transactions", transactions.len());
    Ok(transactions)
}

/// Load transactions from a file
///
/// `format` overrides extension-based detection. With `negate`, every
/// amount flips sign, for exports where expenses are negative.
pub fn load_transactions(
    path: &Path,
    format: Option<FileFormat>,
    negate: bool,
) -> Result<Vec<Transaction>> {
    let format = format
        .or_else(|| FileFormat::from_path(path))
        .ok_or_else(|| {
            Error::Import(format!(
                "Cannot determine format of {} (use .csv or .json)",
                path.display()
            ))
        })?;

    let reader = BufReader::new(File::open(path)?);
    let mut transactions = match format {
        FileFormat::Csv => parse_csv(reader)?,
        FileFormat::Json => parse_json(reader)?,
    };

    if negate {
        for tx in &mut transactions {
            tx.amount = -tx.amount;
        }
    }

    Ok(transactions)
}

/// Parse a timestamp or date in various common formats
///
/// Bare dates land at midnight UTC.
pub fn parse_date(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    let datetime_formats = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
    for fmt in datetime_formats {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    let date_formats = [
        "%Y-%m-%d", // 2024-01-15
        "%m/%d/%Y", // 01/15/2024
        "%m/%d/%y", // 01/15/24
    ];
    for fmt in date_formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
                return Ok(Utc.from_utc_datetime(&midnight));
            }
        }
    }

    Err(Error::Import(format!("Unable to parse date: {}", s)))
}

/// Parse an amount string, handling currency symbols and commas
pub fn parse_amount(s: &str) -> Result<f64> {
    let cleaned: String = s
        .trim()
        .replace(['$', ',', ' '], "")
        .replace('(', "-")
        .replace(')', "");

    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(Error::Import(format!("Unable to parse amount: {}", s))),
    }
}

fn parse_bool(s: &str) -> Result<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Ok(true),
        "false" | "no" | "n" | "0" => Ok(false),
        other => Err(Error::Import(format!("Unable to parse boolean: {}", other))),
    }
}
