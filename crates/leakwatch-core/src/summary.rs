//! Roll-up of a detection run for reporting

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::models::LeakyBucket;

/// Totals across a ranked bucket list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionSummary {
    pub bucket_count: usize,
    pub total_monthly_impact: f64,
    pub total_yearly_impact: f64,
    /// Monthly impact per category, largest first
    pub by_category: Vec<CategoryTotal>,
    /// Merchant name of the highest-impact bucket
    pub top_leak: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: Category,
    pub monthly_impact: f64,
    pub bucket_count: usize,
}

impl DetectionSummary {
    /// Summarize buckets as returned by the detector (ranked)
    pub fn from_buckets(buckets: &[LeakyBucket]) -> Self {
        let mut per_category: BTreeMap<Category, (f64, usize)> = BTreeMap::new();
        for bucket in buckets {
            let entry = per_category.entry(bucket.category).or_insert((0.0, 0));
            entry.0 += bucket.monthly_impact;
            entry.1 += 1;
        }

        let mut by_category: Vec<CategoryTotal> = per_category
            .into_iter()
            .map(|(category, (monthly_impact, bucket_count))| CategoryTotal {
                category,
                monthly_impact,
                bucket_count,
            })
            .collect();
        // Stable: equal totals stay in category order
        by_category.sort_by(|a, b| b.monthly_impact.total_cmp(&a.monthly_impact));

        let total_monthly_impact: f64 = buckets.iter().map(|b| b.monthly_impact).sum();

        Self {
            bucket_count: buckets.len(),
            total_monthly_impact,
            total_yearly_impact: total_monthly_impact * 12.0,
            by_category,
            top_leak: buckets.first().map(|b| b.merchant_name.clone()),
        }
    }
}
