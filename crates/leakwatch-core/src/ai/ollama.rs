//! Ollama backend implementation
//!
//! HTTP client for the Ollama generate API. Both enrichment prompts ask the
//! model for a single JSON object, which `parsing` pulls out of the reply.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::models::LeakyBucket;
use crate::normalize::MerchantGroups;

use super::parsing::{parse_leak_classification, parse_merchant_groups};
use super::types::AiClassification;
use super::{AIBackend, LeakClassifier, MerchantGrouper};

const DEFAULT_MODEL: &str = "llama3.2";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Ollama backend
#[derive(Clone)]
pub struct OllamaBackend {
    http_client: Client,
    base_url: String,
    model: String,
}

impl OllamaBackend {
    /// Create a new Ollama backend
    pub fn new(base_url: &str, model: &str) -> Self {
        let http_client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    /// Create a new instance with a different model
    pub fn with_model(&self, model: &str) -> Self {
        Self {
            http_client: self.http_client.clone(),
            base_url: self.base_url.clone(),
            model: model.to_string(),
        }
    }

    /// Create from environment variables
    ///
    /// Returns None when `OLLAMA_HOST` is unset.
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("OLLAMA_HOST").ok()?;
        let model = std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Some(Self::new(&host, &model))
    }

    async fn generate(&self, prompt: String) -> Result<String> {
        let request = OllamaRequest {
            model: self.model.clone(),
            prompt,
            stream: false,
        };

        let response = self
            .http_client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let ollama_response: OllamaResponse = response.json().await?;
        debug!("Ollama response: {}", ollama_response.response);
        Ok(ollama_response.response)
    }
}

/// Request to Ollama API
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
}

/// Response from Ollama API
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

fn grouping_prompt(merchants: &[String]) -> String {
    let mut prompt = String::from(
        "Group these merchant names from a bank statement by the business they belong to.\n\
         Only group names that clearly refer to the same business.\n\
         Respond with JSON only, in the form \
         {\"groups\": [{\"canonical\": \"Starbucks\", \"members\": [\"STARBUCKS #4471\", \"SBUX 12\"]}]}\n\n\
         Merchants:\n",
    );
    for merchant in merchants {
        prompt.push_str("- ");
        prompt.push_str(merchant);
        prompt.push('\n');
    }
    prompt
}

fn classification_prompt(bucket: &LeakyBucket) -> String {
    format!(
        "Classify this recurring charge as discretionary (a habit the user could cut) \
         or essential (commute, medicine, utilities).\n\
         Respond with JSON only, in the form \
         {{\"is_discretionary\": true, \"reasoning\": \"...\", \"confidence_multiplier\": 1.0}} \
         where confidence_multiplier is between 0.5 and 1.5.\n\n\
         Merchant: {}\n\
         Category: {}\n\
         Frequency: {}\n\
         Average amount: ${:.2}\n\
         Occurrences: {}\n",
        bucket.merchant_name,
        bucket.category,
        bucket.frequency,
        bucket.average_amount,
        bucket.occurrence_count
    )
}

#[async_trait]
impl MerchantGrouper for OllamaBackend {
    async fn group_merchants(&self, merchants: &[String]) -> Result<MerchantGroups> {
        if merchants.is_empty() {
            return Ok(MerchantGroups::new());
        }
        let response = self.generate(grouping_prompt(merchants)).await?;
        parse_merchant_groups(&response)
    }
}

#[async_trait]
impl LeakClassifier for OllamaBackend {
    async fn classify_leak(&self, bucket: &LeakyBucket) -> Result<Option<AiClassification>> {
        let response = self.generate(classification_prompt(bucket)).await?;
        parse_leak_classification(&response).map(Some)
    }
}

#[async_trait]
impl AIBackend for OllamaBackend {
    async fn health_check(&self) -> bool {
        match self
            .http_client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockOllamaServer;

    #[test]
    fn test_new_trims_trailing_slash() {
        let backend = OllamaBackend::new("http://localhost:11434/", "llama3.2");
        assert_eq!(backend.host(), "http://localhost:11434");
        assert_eq!(backend.with_model("gemma3").model(), "gemma3");
    }

    #[test]
    fn test_grouping_prompt_lists_merchants() {
        let prompt = grouping_prompt(&["UBER TRIP".to_string(), "UBER EATS".to_string()]);
        assert!(prompt.starts_with("Group these merchant names"));
        assert!(prompt.contains("- UBER TRIP\n"));
        assert!(prompt.contains("- UBER EATS\n"));
    }

    #[tokio::test]
    async fn test_ollama_round_trip_against_mock_server() {
        let server = MockOllamaServer::start().await;
        let backend = OllamaBackend::new(&server.url(), "llama3.2");

        assert!(backend.health_check().await);

        let groups = backend
            .group_merchants(&["STARBUCKS #4471".to_string(), "Starbucks Reserve".to_string()])
            .await
            .unwrap();
        assert_eq!(groups.len(), 1);
    }

    #[tokio::test]
    async fn test_ollama_server_error_is_reported() {
        let server = MockOllamaServer::start_failing().await;
        let backend = OllamaBackend::new(&server.url(), "llama3.2");

        let err = backend
            .group_merchants(&["STARBUCKS".to_string()])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("HTTP"));
    }

    #[tokio::test]
    async fn test_ollama_unreachable_host_is_unhealthy() {
        let backend = OllamaBackend::new("http://127.0.0.1:1", "llama3.2");
        assert!(!backend.health_check().await);
    }
}
