//! Data models for Leakwatch

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ai::AiClassification;
use crate::category::Category;

/// A bank transaction as handed to the detector
///
/// Sign convention is fixed by the caller: positive = expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Caller-side identifier, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub date: DateTime<Utc>,
    /// Merchant display name as it appears on the statement
    pub merchant: String,
    /// Positive = expense, negative = income/refund
    pub amount: f64,
    /// Upstream category label (e.g. "FOOD_AND_DRINK", "Coffee Shops")
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub is_pending: bool,
    /// User chose to hide this transaction from analysis
    #[serde(default)]
    pub is_excluded: bool,
    /// Merchant logo/icon reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl Transaction {
    pub fn new(date: DateTime<Utc>, merchant: &str, amount: f64) -> Self {
        Self {
            id: None,
            date,
            merchant: merchant.to_string(),
            amount,
            category: None,
            is_pending: false,
            is_excluded: false,
            icon: None,
        }
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn with_icon(mut self, icon: &str) -> Self {
        self.icon = Some(icon.to_string());
        self
    }

    pub fn pending(mut self) -> Self {
        self.is_pending = true;
        self
    }

    pub fn excluded(mut self) -> Self {
        self.is_excluded = true;
        self
    }

    /// Expense that is settled and not hidden by the user
    pub fn is_eligible(&self) -> bool {
        self.amount > 0.0 && !self.is_excluded && !self.is_pending
    }
}

/// Recurrence cadence of a detected pattern, bucketed by mean interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    /// Business-day cadence
    Weekdays,
    Weekly,
    Biweekly,
    Monthly,
    Irregular,
}

impl Frequency {
    /// Classify a mean interval (in days) using half-open bins
    pub fn from_mean_interval(days: f64) -> Self {
        if days < 2.0 {
            Self::Daily
        } else if days < 5.0 {
            Self::Weekdays
        } else if days < 10.0 {
            Self::Weekly
        } else if days < 20.0 {
            Self::Biweekly
        } else if days < 45.0 {
            Self::Monthly
        } else {
            // Also catches NaN
            Self::Irregular
        }
    }

    /// Expected charges per month for this cadence
    ///
    /// Multiplied by the average charge to project a monthly cost, so a
    /// weekly $20 habit comes out near $86.60 rather than $20 × 30.
    pub fn occurrences_per_month(&self) -> f64 {
        match self {
            Self::Daily => 30.0,
            Self::Weekdays => 21.67,
            Self::Weekly => 4.33,
            Self::Biweekly => 2.17,
            Self::Monthly => 1.0,
            Self::Irregular => 0.5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekdays => "weekdays",
            Self::Weekly => "weekly",
            Self::Biweekly => "biweekly",
            Self::Monthly => "monthly",
            Self::Irregular => "irregular",
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected recurring micro-spend pattern
///
/// Produced fresh by every detection run. Attaching an AI classification
/// yields a new bucket; the detector never edits one in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeakyBucket {
    /// Original merchant string of the most recent transaction in the group
    pub merchant_name: String,
    pub category: Category,
    pub frequency: Frequency,
    /// Mean charge across the group
    pub average_amount: f64,
    /// Projected cost per month (`average_amount × occurrences_per_month`)
    pub monthly_impact: f64,
    /// 0.0 - 1.0
    pub confidence_score: f64,
    pub occurrence_count: usize,
    pub first_occurrence: DateTime<Utc>,
    pub last_occurrence: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Attached by the optional enrichment layer only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_classification: Option<AiClassification>,
}

impl LeakyBucket {
    pub fn yearly_impact(&self) -> f64 {
        self.monthly_impact * 12.0
    }

    /// Return a copy of this bucket carrying the given classification
    pub fn with_ai_classification(&self, classification: AiClassification) -> Self {
        Self {
            ai_classification: Some(classification.clamped()),
            ..self.clone()
        }
    }

    /// Confidence after applying the AI multiplier, capped at 1.0
    pub fn adjusted_confidence(&self) -> f64 {
        match &self.ai_classification {
            Some(c) => (self.confidence_score * c.confidence_multiplier).clamp(0.0, 1.0),
            None => self.confidence_score,
        }
    }
}
