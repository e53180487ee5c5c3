//! JSON parsing helpers for AI backend responses
//!
//! These functions extract JSON from AI model responses, which often include
//! extra text before/after the JSON payload.

use crate::error::{Error, Result};
use crate::normalize::MerchantGroups;

use super::types::{AiClassification, GroupingResponse};

const MAX_RAW_IN_ERROR: usize = 200;

/// Truncate long responses for error messages
fn truncate_raw(raw: &str) -> String {
    if raw.chars().count() > MAX_RAW_IN_ERROR {
        format!("{}...", raw.chars().take(MAX_RAW_IN_ERROR).collect::<String>())
    } else {
        raw.to_string()
    }
}

/// Find the outermost JSON object in a model response
fn extract_json_object(response: &str) -> Option<&str> {
    let response = response.trim();
    let start = response.find('{');
    let end = response.rfind('}');

    match (start, end) {
        (Some(s), Some(e)) if s < e => Some(&response[s..=e]),
        _ => None,
    }
}

/// Parse a leak classification from AI response
pub fn parse_leak_classification(response: &str) -> Result<AiClassification> {
    let json_str = extract_json_object(response).ok_or_else(|| {
        Error::InvalidData(format!(
            "No JSON found in AI leak classification response | Raw: {}",
            truncate_raw(response.trim())
        ))
    })?;

    let classification: AiClassification = serde_json::from_str(json_str).map_err(|e| {
        Error::InvalidData(format!(
            "Invalid leak classification JSON from AI: {} | Raw: {}",
            e,
            truncate_raw(json_str)
        ))
    })?;

    Ok(classification.clamped())
}

/// Parse merchant groups from AI response
pub fn parse_merchant_groups(response: &str) -> Result<MerchantGroups> {
    let json_str = extract_json_object(response).ok_or_else(|| {
        Error::InvalidData(format!(
            "No JSON found in AI merchant grouping response | Raw: {}",
            truncate_raw(response.trim())
        ))
    })?;

    let grouping: GroupingResponse = serde_json::from_str(json_str).map_err(|e| {
        Error::InvalidData(format!(
            "Invalid merchant grouping JSON from AI: {} | Raw: {}",
            e,
            truncate_raw(json_str)
        ))
    })?;

    Ok(grouping.into_merchant_groups())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_classification_with_surrounding_text() {
        let response = r#"Sure! Here is my answer:
{"is_discretionary": true, "reasoning": "Daily coffee", "confidence_multiplier": 1.2}
Hope that helps."#;
        let c = parse_leak_classification(response).unwrap();
        assert!(c.is_discretionary);
        assert_eq!(c.reasoning, "Daily coffee");
        assert_eq!(c.confidence_multiplier, 1.2);
    }

    #[test]
    fn test_parse_classification_clamps_multiplier() {
        let c = parse_leak_classification(
            r#"{"is_discretionary": true, "reasoning": "x", "confidence_multiplier": 9}"#,
        )
        .unwrap();
        assert_eq!(c.confidence_multiplier, 1.5);
    }

    #[test]
    fn test_parse_classification_no_json() {
        let err = parse_leak_classification("I cannot help with that").unwrap_err();
        assert!(err.to_string().contains("No JSON found"));
    }

    #[test]
    fn test_parse_classification_malformed_json() {
        let err = parse_leak_classification(r#"{"is_discretionary": maybe}"#).unwrap_err();
        assert!(err.to_string().contains("Invalid leak classification JSON"));
    }

    #[test]
    fn test_parse_merchant_groups() {
        let response = r#"```json
{"groups": [{"canonical": "Uber", "members": ["UBER TRIP 551", "UBER *EATS"]}]}
```"#;
        let groups = parse_merchant_groups(response).unwrap();
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn test_truncate_raw_handles_multibyte() {
        let long = "☕".repeat(300);
        let truncated = truncate_raw(&long);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.chars().count(), MAX_RAW_IN_ERROR + 3);
    }
}
