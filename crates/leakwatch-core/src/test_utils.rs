//! Test utilities for leakwatch-core
//!
//! This module provides a mock Ollama server for exercising the HTTP
//! enrichment backend in development and integration tests.

use std::collections::BTreeMap;
use std::net::SocketAddr;

use axum::{
    extract::Json,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// Mock Ollama server for testing and development
pub struct MockOllamaServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockOllamaServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let app = Router::new()
            .route("/api/tags", get(handle_tags))
            .route("/api/generate", post(handle_generate));
        Self::serve(app).await
    }

    /// Start a server whose every endpoint answers 503
    pub async fn start_failing() -> Self {
        let app = Router::new()
            .route("/api/tags", get(handle_unavailable))
            .route("/api/generate", post(handle_unavailable));
        Self::serve(app).await
    }

    async fn serve(app: Router) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockOllamaServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Ollama tags endpoint response (health check)
async fn handle_tags() -> Json<TagsResponse> {
    Json(TagsResponse {
        models: vec![ModelInfo {
            name: "llama3.2:latest".to_string(),
            modified_at: "2024-01-01T00:00:00Z".to_string(),
            size: 2_000_000_000,
        }],
    })
}

async fn handle_unavailable() -> StatusCode {
    StatusCode::SERVICE_UNAVAILABLE
}

/// Ollama generate endpoint
async fn handle_generate(Json(request): Json<GenerateRequest>) -> Json<GenerateResponse> {
    // Dispatch on the prompt wording used by OllamaBackend
    let body = if request.prompt.starts_with("Group these merchant names") {
        group_merchants_mock(&request.prompt)
    } else if request.prompt.contains("Merchant: ") {
        classify_leak_mock(&request.prompt)
    } else {
        "I'm not sure what you're asking.".to_string()
    };

    // Models like to wrap JSON in prose; the parser has to cope
    Json(GenerateResponse {
        model: request.model,
        response: format!("Here is the result:\n{}\n", body),
        done: true,
    })
}

/// Group "- NAME" lines by their first word
fn group_merchants_mock(prompt: &str) -> String {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for name in prompt.lines().filter_map(|l| l.strip_prefix("- ")) {
        let Some(word) = name.split_whitespace().next() else {
            continue;
        };
        let canonical = word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
        if canonical.is_empty() {
            continue;
        }
        groups.entry(canonical).or_default().push(name.to_string());
    }

    let groups: Vec<serde_json::Value> = groups
        .into_iter()
        .map(|(canonical, members)| serde_json::json!({ "canonical": canonical, "members": members }))
        .collect();
    serde_json::json!({ "groups": groups }).to_string()
}

fn classify_leak_mock(prompt: &str) -> String {
    let merchant = extract_field(prompt, "Merchant: ").unwrap_or_default();
    let m = merchant.to_uppercase();

    let (is_discretionary, reasoning, multiplier) = if m.contains("PHARMACY")
        || m.contains("TRANSIT")
        || m.contains("ELECTRIC")
    {
        (false, "essential expense", 0.8)
    } else if m.contains("STARBUCKS") || m.contains("DOORDASH") || m.contains("COFFEE") {
        (true, "daily habit", 1.3)
    } else {
        (true, "recurring purchase", 1.0)
    };

    serde_json::json!({
        "is_discretionary": is_discretionary,
        "reasoning": reasoning,
        "confidence_multiplier": multiplier,
    })
    .to_string()
}

/// Value of a "Label: value" line
fn extract_field(prompt: &str, label: &str) -> Option<String> {
    prompt
        .lines()
        .find_map(|l| l.strip_prefix(label))
        .map(|v| v.trim().to_string())
}

#[derive(Debug, Serialize)]
struct TagsResponse {
    models: Vec<ModelInfo>,
}

#[derive(Debug, Serialize)]
struct ModelInfo {
    name: String,
    modified_at: String,
    size: u64,
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
}

#[derive(Debug, Serialize)]
struct GenerateResponse {
    model: String,
    response: String,
    done: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{AIBackend, LeakClassifier, MerchantGrouper, OllamaBackend};
    use crate::category::Category;
    use crate::models::{Frequency, LeakyBucket};
    use chrono::{TimeZone, Utc};

    fn bucket(name: &str) -> LeakyBucket {
        let date = Utc.with_ymd_and_hms(2024, 4, 1, 7, 30, 0).unwrap();
        LeakyBucket {
            merchant_name: name.to_string(),
            category: Category::Other,
            frequency: Frequency::Daily,
            average_amount: 4.75,
            monthly_impact: 4.75 * 30.0,
            confidence_score: 0.7,
            occurrence_count: 20,
            first_occurrence: date,
            last_occurrence: date,
            icon: None,
            ai_classification: None,
        }
    }

    #[test]
    fn test_group_merchants_mock_by_first_word() {
        let body = group_merchants_mock("Group these merchant names\n- UBER TRIP 1\n- Uber Eats\n- LYFT\n");
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        let groups = value["groups"].as_array().unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1]["canonical"], "uber");
        assert_eq!(groups[1]["members"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_mock_server_health_check() {
        let server = MockOllamaServer::start().await;
        let client = OllamaBackend::new(&server.url(), "test-model");
        assert!(client.health_check().await);
    }

    #[tokio::test]
    async fn test_mock_server_classifies_coffee_habit() {
        let server = MockOllamaServer::start().await;
        let client = OllamaBackend::new(&server.url(), "test-model");

        let result = client
            .classify_leak(&bucket("STARBUCKS #102"))
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_discretionary);
        assert_eq!(result.confidence_multiplier, 1.3);
    }

    #[tokio::test]
    async fn test_mock_server_classifies_pharmacy_as_essential() {
        let server = MockOllamaServer::start().await;
        let client = OllamaBackend::new(&server.url(), "test-model");

        let result = client
            .classify_leak(&bucket("WALGREENS PHARMACY"))
            .await
            .unwrap()
            .unwrap();
        assert!(!result.is_discretionary);
    }

    #[tokio::test]
    async fn test_mock_server_groups_merchants() {
        let server = MockOllamaServer::start().await;
        let client = OllamaBackend::new(&server.url(), "test-model");

        let merchants = vec![
            "UBER TRIP 551".to_string(),
            "UBER *EATS".to_string(),
            "LYFT RIDE".to_string(),
        ];
        let groups = client.group_merchants(&merchants).await.unwrap();
        assert_eq!(groups.len(), 2);
    }

    #[tokio::test]
    async fn test_failing_server_is_unhealthy() {
        let server = MockOllamaServer::start_failing().await;
        let client = OllamaBackend::new(&server.url(), "test-model");
        assert!(!client.health_check().await);
        assert!(client.classify_leak(&bucket("STARBUCKS")).await.is_err());
    }
}
