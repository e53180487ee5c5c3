//! Mock backend for testing
//!
//! Keyword-based grouping and classification with predictable output.
//! Useful for unit tests and development without a running LLM server.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::category::Category;
use crate::error::{Error, Result};
use crate::models::LeakyBucket;
use crate::normalize::MerchantGroups;

use super::types::AiClassification;
use super::{AIBackend, LeakClassifier, MerchantGrouper};

/// Merchants the mock treats as essential spending
const ESSENTIAL_KEYWORDS: &[&str] = &["PHARMACY", "ELECTRIC", "WATER", "TRANSIT", "METRO", "CVS"];

/// Mock AI backend for testing
///
/// Returns predictable responses for all AI operations. A failing mock
/// returns an error from every call, for exercising fallback paths.
#[derive(Clone, Default)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    /// Whether every call should fail
    pub failing: bool,
}

impl MockBackend {
    /// Create a new mock backend (healthy by default)
    pub fn new() -> Self {
        Self {
            healthy: true,
            failing: false,
        }
    }

    /// Create an unhealthy mock backend
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            failing: false,
        }
    }

    /// Create a mock whose grouping and classification calls all error
    pub fn failing() -> Self {
        Self {
            healthy: false,
            failing: true,
        }
    }

    fn check_failing(&self) -> Result<()> {
        if self.failing {
            return Err(Error::Ai("mock backend configured to fail".into()));
        }
        Ok(())
    }
}

/// First alphabetic word, title-cased ("STARBUCKS #4471" -> "Starbucks")
fn brand_of(merchant: &str) -> Option<String> {
    let word = merchant
        .split(|c: char| !c.is_alphabetic())
        .find(|w| w.len() >= 2)?;
    let mut chars = word.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect())
}

#[async_trait]
impl MerchantGrouper for MockBackend {
    async fn group_merchants(&self, merchants: &[String]) -> Result<MerchantGroups> {
        self.check_failing()?;

        let mut by_brand: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for merchant in merchants {
            if let Some(brand) = brand_of(merchant) {
                by_brand.entry(brand).or_default().push(merchant.clone());
            }
        }
        Ok(MerchantGroups::from(by_brand))
    }
}

#[async_trait]
impl LeakClassifier for MockBackend {
    async fn classify_leak(&self, bucket: &LeakyBucket) -> Result<Option<AiClassification>> {
        self.check_failing()?;

        let merchant_upper = bucket.merchant_name.to_uppercase();
        let essential = matches!(
            bucket.category,
            Category::Utilities | Category::Health | Category::Transfer | Category::Income
        ) || ESSENTIAL_KEYWORDS.iter().any(|k| merchant_upper.contains(k));

        let classification = if essential {
            AiClassification {
                is_discretionary: false,
                reasoning: "Essential recurring expense".to_string(),
                confidence_multiplier: 0.8,
            }
        } else if matches!(
            bucket.category,
            Category::Food | Category::Entertainment | Category::Shopping
        ) {
            AiClassification {
                is_discretionary: true,
                reasoning: "Discretionary habit".to_string(),
                confidence_multiplier: 1.2,
            }
        } else {
            AiClassification {
                is_discretionary: true,
                reasoning: "Recurring discretionary charge".to_string(),
                confidence_multiplier: 1.0,
            }
        };

        Ok(Some(classification))
    }
}

#[async_trait]
impl AIBackend for MockBackend {
    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}
