//! Optional AI enrichment for leak detection
//!
//! The detector is complete without this module. When a backend is
//! available it can refine two things:
//!
//! - merchant grouping (`MerchantGrouper`), replacing the built-in
//!   normalization for the merchants it recognizes
//! - bucket classification (`LeakClassifier`), dropping essentials and
//!   scaling confidence for discretionary habits
//!
//! # Architecture
//!
//! - `MerchantGrouper` / `LeakClassifier` traits: the two capabilities
//! - `AIBackend` trait: a backend that offers both, plus health info
//! - `AIClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - `Enricher`: runs detection with whichever capabilities are present and
//!   falls back to plain detection on failure
//!
//! # Configuration
//!
//! Environment variables:
//! - `AI_BACKEND`: Backend to use (ollama, mock, none). Default: ollama
//! - `OLLAMA_HOST`: Ollama server URL (required for ollama backend)
//! - `OLLAMA_MODEL`: Model name (default: llama3.2)

mod enrich;
pub mod mock;
pub mod ollama;
pub mod parsing;
pub mod types;

pub use enrich::{Enricher, EnrichmentOutcome, CLASSIFIER_FAILURE_THRESHOLD};
pub use mock::MockBackend;
pub use ollama::OllamaBackend;
pub use types::*;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::LeakyBucket;
use crate::normalize::MerchantGroups;

/// Maps raw merchant strings to canonical merchant names
#[async_trait]
pub trait MerchantGrouper: Send + Sync {
    /// Propose groups for the given distinct raw merchant names
    ///
    /// Names left out of every group keep the built-in normalization.
    async fn group_merchants(&self, merchants: &[String]) -> Result<MerchantGroups>;
}

/// Decides whether a detected bucket is a discretionary leak
#[async_trait]
pub trait LeakClassifier: Send + Sync {
    /// `Ok(None)` means the classifier has no opinion on this bucket
    async fn classify_leak(&self, bucket: &LeakyBucket) -> Result<Option<AiClassification>>;
}

/// A backend offering both enrichment capabilities
#[async_trait]
pub trait AIBackend: MerchantGrouper + LeakClassifier {
    /// Check if the backend is available
    async fn health_check(&self) -> bool;

    /// Get the model name
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Enrichment that never changes anything
///
/// Returns no groups and no classifications, so detection output is
/// exactly what the deterministic pipeline produces.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEnricher;

#[async_trait]
impl MerchantGrouper for NoopEnricher {
    async fn group_merchants(&self, _merchants: &[String]) -> Result<MerchantGroups> {
        Ok(MerchantGroups::new())
    }
}

#[async_trait]
impl LeakClassifier for NoopEnricher {
    async fn classify_leak(&self, _bucket: &LeakyBucket) -> Result<Option<AiClassification>> {
        Ok(None)
    }
}

/// Concrete AI client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum AIClient {
    /// Ollama backend (HTTP API)
    Ollama(OllamaBackend),
    /// Mock backend for testing
    Mock(MockBackend),
}

impl AIClient {
    /// Create an AI client from environment variables
    ///
    /// Checks `AI_BACKEND` to determine which backend to use:
    /// - `ollama` (default): Uses OLLAMA_HOST and OLLAMA_MODEL
    /// - `mock`: Creates a mock backend for testing
    /// - `none` / `off`: AI disabled
    ///
    /// Returns None if AI is disabled or the required environment variables
    /// are not set.
    pub fn from_env() -> Option<Self> {
        let backend = std::env::var("AI_BACKEND").unwrap_or_else(|_| "ollama".to_string());
        Self::from_backend_name(&backend)
    }

    fn from_backend_name(backend: &str) -> Option<Self> {
        match backend.trim().to_lowercase().as_str() {
            "ollama" => OllamaBackend::from_env().map(AIClient::Ollama),
            "mock" => Some(AIClient::mock()),
            "none" | "off" | "disabled" => None,
            _ => {
                tracing::warn!(backend = %backend, "Unknown AI_BACKEND, falling back to ollama");
                OllamaBackend::from_env().map(AIClient::Ollama)
            }
        }
    }

    /// Create an Ollama backend directly
    pub fn ollama(host: &str, model: &str) -> Self {
        AIClient::Ollama(OllamaBackend::new(host, model))
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        AIClient::Mock(MockBackend::new())
    }

    /// Short backend name for logs
    pub fn backend_name(&self) -> &'static str {
        match self {
            AIClient::Ollama(_) => "ollama",
            AIClient::Mock(_) => "mock",
        }
    }
}

// Delegate to the inner backend
#[async_trait]
impl MerchantGrouper for AIClient {
    async fn group_merchants(&self, merchants: &[String]) -> Result<MerchantGroups> {
        match self {
            AIClient::Ollama(b) => b.group_merchants(merchants).await,
            AIClient::Mock(b) => b.group_merchants(merchants).await,
        }
    }
}

#[async_trait]
impl LeakClassifier for AIClient {
    async fn classify_leak(&self, bucket: &LeakyBucket) -> Result<Option<AiClassification>> {
        match self {
            AIClient::Ollama(b) => b.classify_leak(bucket).await,
            AIClient::Mock(b) => b.classify_leak(bucket).await,
        }
    }
}

#[async_trait]
impl AIBackend for AIClient {
    async fn health_check(&self) -> bool {
        match self {
            AIClient::Ollama(b) => b.health_check().await,
            AIClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AIClient::Ollama(b) => b.model(),
            AIClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AIClient::Ollama(b) => b.host(),
            AIClient::Mock(b) => b.host(),
        }
    }
}
