//! Enriched detection
//!
//! Wraps the deterministic detector with optional merchant grouping and
//! leak classification. Backend failures never change the plain result.

use tracing::{debug, info, warn};

use crate::detect::{filter_eligible, LeakDetector};
use crate::models::{LeakyBucket, Transaction};
use crate::normalize::MerchantGroups;

use super::{AIBackend, LeakClassifier, MerchantGrouper};

/// Consecutive classifier errors after which the rest of the run skips it
pub const CLASSIFIER_FAILURE_THRESHOLD: usize = 3;

/// Result of an enriched detection run
#[derive(Debug, Clone, Default)]
pub struct EnrichmentOutcome {
    /// Ranked buckets, essentials removed, classifications attached
    pub buckets: Vec<LeakyBucket>,
    /// Whether grouping suggestions were used instead of normalization
    pub grouping_applied: bool,
    /// Buckets that received a classification
    pub classified: usize,
    /// Buckets removed as non-discretionary
    pub dropped: usize,
    /// Classifier calls that errored
    pub failures: usize,
}

/// Runs detection with optional grouping and classification
///
/// Every failure degrades to the plain detector's behavior: a grouping
/// error falls back to built-in normalization, a classification error
/// leaves that bucket unclassified.
#[derive(Clone, Copy, Default)]
pub struct Enricher<'a> {
    grouper: Option<&'a dyn MerchantGrouper>,
    classifier: Option<&'a dyn LeakClassifier>,
}

impl<'a> Enricher<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grouper(mut self, grouper: &'a dyn MerchantGrouper) -> Self {
        self.grouper = Some(grouper);
        self
    }

    pub fn with_classifier(mut self, classifier: &'a dyn LeakClassifier) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Use one backend for both capabilities
    pub fn with_backend<B: AIBackend + 'a>(self, backend: &'a B) -> Self {
        self.with_grouper(backend).with_classifier(backend)
    }

    pub async fn run(
        &self,
        detector: &LeakDetector,
        transactions: &[Transaction],
    ) -> EnrichmentOutcome {
        let groups = match self.grouper {
            Some(grouper) => fetch_groups(grouper, transactions).await,
            None => None,
        };

        let buckets = detector.detect_with_groups(transactions, groups.as_ref());
        let mut outcome = EnrichmentOutcome {
            grouping_applied: groups.is_some(),
            ..Default::default()
        };

        match self.classifier {
            Some(classifier) => classify_all(classifier, buckets, &mut outcome).await,
            None => outcome.buckets = buckets,
        }

        info!(
            "Enrichment: {} buckets, {} classified, {} dropped, {} classifier failures",
            outcome.buckets.len(),
            outcome.classified,
            outcome.dropped,
            outcome.failures
        );
        outcome
    }
}

/// Distinct raw merchant names among eligible transactions, sorted
fn distinct_merchants(transactions: &[Transaction]) -> Vec<String> {
    let mut merchants: Vec<String> = filter_eligible(transactions)
        .into_iter()
        .map(|t| t.merchant.clone())
        .collect();
    merchants.sort();
    merchants.dedup();
    merchants
}

async fn fetch_groups(
    grouper: &dyn MerchantGrouper,
    transactions: &[Transaction],
) -> Option<MerchantGroups> {
    let merchants = distinct_merchants(transactions);
    if merchants.is_empty() {
        return None;
    }

    match grouper.group_merchants(&merchants).await {
        Ok(groups) if groups.is_empty() => {
            debug!("Grouper returned no groups, using built-in normalization");
            None
        }
        Ok(groups) => {
            debug!("Grouper proposed {} groups for {} merchants", groups.len(), merchants.len());
            Some(groups)
        }
        Err(e) => {
            warn!("Merchant grouping failed, using built-in normalization: {}", e);
            None
        }
    }
}

async fn classify_all(
    classifier: &dyn LeakClassifier,
    buckets: Vec<LeakyBucket>,
    outcome: &mut EnrichmentOutcome,
) {
    let mut consecutive_failures = 0;

    for bucket in buckets {
        if consecutive_failures >= CLASSIFIER_FAILURE_THRESHOLD {
            outcome.buckets.push(bucket);
            continue;
        }

        match classifier.classify_leak(&bucket).await {
            Ok(Some(classification)) => {
                consecutive_failures = 0;
                if !classification.is_discretionary {
                    debug!(
                        "Dropping {} - classified essential: {}",
                        bucket.merchant_name, classification.reasoning
                    );
                    outcome.dropped += 1;
                    continue;
                }
                outcome.classified += 1;
                outcome.buckets.push(bucket.with_ai_classification(classification));
            }
            Ok(None) => {
                consecutive_failures = 0;
                outcome.buckets.push(bucket);
            }
            Err(e) => {
                consecutive_failures += 1;
                outcome.failures += 1;
                warn!("Classification failed for {}: {}", bucket.merchant_name, e);
                if consecutive_failures == CLASSIFIER_FAILURE_THRESHOLD {
                    warn!(
                        "Classifier failed {} times in a row, skipping it for remaining buckets",
                        consecutive_failures
                    );
                }
                outcome.buckets.push(bucket);
            }
        }
    }
}
