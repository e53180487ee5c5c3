//! Leaky bucket detection
//!
//! Turns a flat list of transactions into ranked recurring micro-spend
//! patterns. Five stages, each a plain function over the previous one's
//! output:
//!
//! 1. Filtering: settled, non-excluded expenses only
//! 2. Grouping: merchant normalization (or a caller override)
//! 3. Candidate selection: enough occurrences, small enough average
//! 4. Pattern analysis: interval/amount statistics, frequency, confidence
//! 5. Ranking: by projected monthly cost
//!
//! Detection is pure. The same transactions and config always produce the
//! same buckets in the same order, and nothing is cached between calls.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::category::Category;
use crate::config::DetectorConfig;
use crate::models::{Frequency, LeakyBucket, Transaction};
use crate::normalize::{group_transactions, GroupKey, MerchantGroups};
use crate::stats::{amount_coefficient_of_variation, day_intervals, mean, IntervalStats};

/// Weight of the occurrence sub-score in the confidence blend
pub const OCCURRENCE_WEIGHT: f64 = 0.40;
/// Weight of interval regularity; timing matters most for a leak
pub const INTERVAL_WEIGHT: f64 = 0.35;
/// Weight of amount regularity
pub const AMOUNT_WEIGHT: f64 = 0.25;
/// Occurrence count at which the occurrence sub-score saturates
pub const OCCURRENCE_SATURATION: f64 = 10.0;

/// The three normalized sub-scores behind a confidence score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceBreakdown {
    pub occurrence: f64,
    pub interval_consistency: f64,
    pub amount_consistency: f64,
}

impl ConfidenceBreakdown {
    pub fn new(occurrence_count: usize, interval_cv: f64, amount_cv: f64) -> Self {
        Self {
            occurrence: (occurrence_count as f64 / OCCURRENCE_SATURATION).min(1.0),
            interval_consistency: (1.0 - interval_cv).max(0.0),
            amount_consistency: (1.0 - amount_cv).max(0.0),
        }
    }

    pub fn score(&self) -> f64 {
        OCCURRENCE_WEIGHT * self.occurrence
            + INTERVAL_WEIGHT * self.interval_consistency
            + AMOUNT_WEIGHT * self.amount_consistency
    }
}

/// Statistics computed for one candidate group
#[derive(Debug, Clone, PartialEq)]
pub struct PatternAnalysis {
    pub intervals: IntervalStats,
    pub amount_coefficient_of_variation: f64,
    pub frequency: Frequency,
    pub average_amount: f64,
    pub confidence: ConfidenceBreakdown,
}

impl PatternAnalysis {
    /// Analyze a group sorted ascending by date
    ///
    /// Returns None for groups too small to have an interval.
    pub fn from_sorted(transactions: &[&Transaction]) -> Option<Self> {
        let dates: Vec<DateTime<Utc>> = transactions.iter().map(|t| t.date).collect();
        let intervals = IntervalStats::from_intervals(&day_intervals(&dates))?;

        let amounts: Vec<f64> = transactions.iter().map(|t| t.amount.abs()).collect();
        let amount_cv = amount_coefficient_of_variation(&amounts);

        Some(Self {
            frequency: Frequency::from_mean_interval(intervals.mean),
            average_amount: mean(&group_amounts(transactions)),
            confidence: ConfidenceBreakdown::new(
                transactions.len(),
                intervals.coefficient_of_variation,
                amount_cv,
            ),
            amount_coefficient_of_variation: amount_cv,
            intervals,
        })
    }

    pub fn confidence_score(&self) -> f64 {
        self.confidence.score()
    }

    pub fn monthly_impact(&self) -> f64 {
        (self.average_amount * self.frequency.occurrences_per_month()).max(0.0)
    }
}

/// Stateless leaky bucket detector
///
/// Holds only an immutable config, so a single detector can be shared
/// across threads without locking.
#[derive(Debug, Clone, Default)]
pub struct LeakDetector {
    config: DetectorConfig,
}

impl LeakDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Detect leaky buckets using built-in merchant normalization
    pub fn detect(&self, transactions: &[Transaction]) -> Vec<LeakyBucket> {
        self.detect_with_groups(transactions, None)
    }

    /// Detect leaky buckets, letting `merchant_groups` override grouping
    ///
    /// Transactions whose raw merchant name appears in a supplied group are
    /// assigned to it; the rest fall back to normalization.
    pub fn detect_with_groups(
        &self,
        transactions: &[Transaction],
        merchant_groups: Option<&MerchantGroups>,
    ) -> Vec<LeakyBucket> {
        let eligible = filter_eligible(transactions);
        if eligible.is_empty() {
            debug!("No eligible transactions out of {}", transactions.len());
            return Vec::new();
        }

        let groups = group_transactions(&eligible, merchant_groups);
        let group_count = groups.len();
        let candidates = select_candidates(groups, &self.config);
        let candidate_count = candidates.len();

        let mut buckets: Vec<LeakyBucket> = candidates
            .into_iter()
            .filter_map(|(key, txs)| analyze_group(&key, txs, &self.config))
            .collect();
        rank_buckets(&mut buckets);

        info!(
            "Leak detection: {} eligible transactions, {} merchant groups, {} candidates, {} leaky buckets",
            eligible.len(),
            group_count,
            candidate_count,
            buckets.len()
        );

        buckets
    }
}

/// Convenience entry point: detect with an explicit config
pub fn detect(
    transactions: &[Transaction],
    config: &DetectorConfig,
    merchant_groups: Option<&MerchantGroups>,
) -> Vec<LeakyBucket> {
    LeakDetector::new(config.clone()).detect_with_groups(transactions, merchant_groups)
}

/// Stage 1: settled expenses that the user hasn't excluded
pub fn filter_eligible(transactions: &[Transaction]) -> Vec<&Transaction> {
    transactions.iter().filter(|t| t.is_eligible()).collect()
}

/// Stage 3: drop groups that can't be a recurring micro-spend
pub fn select_candidates<'a>(
    groups: BTreeMap<GroupKey, Vec<&'a Transaction>>,
    config: &DetectorConfig,
) -> Vec<(GroupKey, Vec<&'a Transaction>)> {
    groups
        .into_iter()
        .filter(|(key, txs)| {
            if txs.len() < config.minimum_occurrences {
                debug!(
                    "Skipping {} - {} occurrences (need {})",
                    key,
                    txs.len(),
                    config.minimum_occurrences
                );
                return false;
            }
            let average = mean(&group_amounts(txs));
            if average > config.max_amount_for_micro_spend {
                debug!(
                    "Skipping {} - average ${:.2} above micro-spend ceiling ${:.2}",
                    key, average, config.max_amount_for_micro_spend
                );
                return false;
            }
            true
        })
        .collect()
}

/// Stage 4: turn one candidate group into a bucket, or reject it
pub fn analyze_group(
    key: &GroupKey,
    mut transactions: Vec<&Transaction>,
    config: &DetectorConfig,
) -> Option<LeakyBucket> {
    if transactions.len() < 2 {
        debug!("Skipping {} - need at least 2 transactions for an interval", key);
        return None;
    }

    // Stable sort: same-timestamp transactions keep input order
    transactions.sort_by_key(|t| t.date);

    let analysis = PatternAnalysis::from_sorted(&transactions)?;
    let score = analysis.confidence_score();
    if score < config.min_confidence_threshold {
        debug!(
            "Skipping {} - confidence {:.2} below {:.2} (interval cv {:.2}, amount cv {:.2})",
            key,
            score,
            config.min_confidence_threshold,
            analysis.intervals.coefficient_of_variation,
            analysis.amount_coefficient_of_variation
        );
        return None;
    }

    let first = transactions.first()?;
    let latest = transactions.last()?;
    let category_label = transactions
        .iter()
        .rev()
        .find_map(|t| t.category.as_deref().filter(|c| !c.trim().is_empty()));
    let icon = transactions.iter().rev().find_map(|t| t.icon.clone());

    debug!(
        "Found leak: {} ({} x ${:.2}, {}, confidence {:.2})",
        latest.merchant,
        transactions.len(),
        analysis.average_amount,
        analysis.frequency,
        score
    );

    Some(LeakyBucket {
        merchant_name: latest.merchant.clone(),
        category: Category::from_optional_label(category_label),
        frequency: analysis.frequency,
        average_amount: analysis.average_amount,
        monthly_impact: analysis.monthly_impact(),
        confidence_score: score,
        occurrence_count: transactions.len(),
        first_occurrence: first.date,
        last_occurrence: latest.date,
        icon,
        ai_classification: None,
    })
}

/// Stage 5: highest monthly impact first
///
/// Ties fall back to occurrence count (desc), merchant name, then first
/// occurrence so the order is fully deterministic.
pub fn rank_buckets(buckets: &mut [LeakyBucket]) {
    buckets.sort_by(compare_buckets);
}

fn compare_buckets(a: &LeakyBucket, b: &LeakyBucket) -> Ordering {
    b.monthly_impact
        .total_cmp(&a.monthly_impact)
        .then_with(|| b.occurrence_count.cmp(&a.occurrence_count))
        .then_with(|| a.merchant_name.cmp(&b.merchant_name))
        .then_with(|| a.first_occurrence.cmp(&b.first_occurrence))
}

/// Keep transactions in `(as_of - days, as_of]`
///
/// Callers use this to trim history to `analysis_window_days` before
/// detection; the detector itself never looks at the window.
pub fn within_window(
    transactions: &[Transaction],
    as_of: DateTime<Utc>,
    days: u32,
) -> Vec<Transaction> {
    let start = as_of - Duration::days(i64::from(days));
    transactions
        .iter()
        .filter(|t| t.date > start && t.date <= as_of)
        .cloned()
        .collect()
}

fn group_amounts(transactions: &[&Transaction]) -> Vec<f64> {
    transactions.iter().map(|t| t.amount).collect()
}
