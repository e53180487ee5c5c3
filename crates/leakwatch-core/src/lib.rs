//! Leakwatch Core Library
//!
//! Detects "leaky buckets" in a transaction history: small charges that
//! recur often enough to add up.
//! - Merchant normalization and grouping
//! - Recurrence analysis and confidence scoring
//! - Ranking by projected monthly impact
//! - Layered detector configuration (TOML + environment)
//! - CSV/JSON transaction loading
//! - Optional local AI enrichment (Ollama) for grouping and classification
//!
//! ```rust,ignore
//! use leakwatch_core::{DetectorConfig, LeakDetector};
//!
//! let detector = LeakDetector::new(DetectorConfig::default());
//! for bucket in detector.detect(&transactions) {
//!     println!("{}: ${:.2}/mo", bucket.merchant_name, bucket.monthly_impact);
//! }
//! ```

pub mod ai;
pub mod category;
pub mod config;
pub mod detect;
pub mod error;
pub mod import;
pub mod models;
pub mod normalize;
pub mod stats;
pub mod summary;

/// Test utilities including mock Ollama server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{
    AIBackend, AIClient, AiClassification, Enricher, EnrichmentOutcome, LeakClassifier,
    MerchantGrouper, MockBackend, NoopEnricher, OllamaBackend,
};
pub use category::Category;
pub use config::DetectorConfig;
pub use detect::{detect, within_window, LeakDetector};
pub use error::{Error, Result};
pub use import::{load_transactions, FileFormat};
pub use models::{Frequency, LeakyBucket, Transaction};
pub use normalize::{normalize_merchant, GroupKey, MerchantGroups};
pub use summary::{CategoryTotal, DetectionSummary};
