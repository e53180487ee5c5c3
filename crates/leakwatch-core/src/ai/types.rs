//! AI backend response types
//!
//! These types are backend-agnostic and used across all AI implementations.

use serde::{Deserialize, Serialize};

use crate::normalize::MerchantGroups;

/// Lowest multiplier a classifier may apply to a bucket's confidence
pub const MIN_CONFIDENCE_MULTIPLIER: f64 = 0.5;
/// Highest multiplier a classifier may apply to a bucket's confidence
pub const MAX_CONFIDENCE_MULTIPLIER: f64 = 1.5;

fn default_multiplier() -> f64 {
    1.0
}

/// Verdict on whether a detected pattern is really a discretionary leak
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiClassification {
    /// False for essentials (transit pass, pharmacy, utilities)
    #[serde(alias = "is_leak")]
    pub is_discretionary: bool,
    /// Brief explanation of the classification
    #[serde(default, alias = "reason")]
    pub reasoning: String,
    /// Scales the bucket's confidence, roughly 0.5 - 1.5
    #[serde(default = "default_multiplier")]
    pub confidence_multiplier: f64,
}

impl AiClassification {
    /// Force the multiplier into the supported range
    pub fn clamped(mut self) -> Self {
        self.confidence_multiplier = if self.confidence_multiplier.is_finite() {
            self.confidence_multiplier
                .clamp(MIN_CONFIDENCE_MULTIPLIER, MAX_CONFIDENCE_MULTIPLIER)
        } else {
            default_multiplier()
        };
        self
    }
}

/// One group proposed by a merchant grouper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupingSuggestion {
    /// Clean merchant name (e.g., "Starbucks")
    #[serde(alias = "merchant", alias = "name")]
    pub canonical: String,
    /// Raw statement strings belonging to it
    #[serde(default, alias = "raw_names")]
    pub members: Vec<String>,
}

/// Merchant grouping response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupingResponse {
    #[serde(default)]
    pub groups: Vec<GroupingSuggestion>,
}

impl GroupingResponse {
    /// Convert to an override map, dropping blank names and empty groups
    pub fn into_merchant_groups(self) -> MerchantGroups {
        let mut groups = MerchantGroups::new();
        for suggestion in self.groups {
            let canonical = suggestion.canonical.trim();
            let members: Vec<String> = suggestion
                .members
                .into_iter()
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect();
            if canonical.is_empty() || members.is_empty() {
                continue;
            }
            groups.insert(canonical, members);
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamped_multiplier() {
        let c = AiClassification {
            is_discretionary: true,
            reasoning: String::new(),
            confidence_multiplier: 0.1,
        };
        assert_eq!(c.clamped().confidence_multiplier, 0.5);

        let c = AiClassification {
            is_discretionary: true,
            reasoning: String::new(),
            confidence_multiplier: f64::NAN,
        };
        assert_eq!(c.clamped().confidence_multiplier, 1.0);
    }

    #[test]
    fn test_classification_aliases_and_defaults() {
        let c: AiClassification =
            serde_json::from_str(r#"{"is_leak": false, "reason": "Commute"}"#).unwrap();
        assert!(!c.is_discretionary);
        assert_eq!(c.reasoning, "Commute");
        assert_eq!(c.confidence_multiplier, 1.0);
    }

    #[test]
    fn test_grouping_response_skips_empty_groups() {
        let response: GroupingResponse = serde_json::from_str(
            r#"{"groups": [
                {"canonical": "Starbucks", "members": ["STARBUCKS #4471", " SBUX 12 "]},
                {"canonical": "  ", "members": ["x"]},
                {"canonical": "Lonely", "members": []}
            ]}"#,
        )
        .unwrap();

        let groups = response.into_merchant_groups();
        assert_eq!(groups.len(), 1);
        let (name, members) = groups.iter().next().unwrap();
        assert_eq!(name, "Starbucks");
        assert_eq!(members, &vec!["STARBUCKS #4471".to_string(), "SBUX 12".to_string()]);
    }
}
