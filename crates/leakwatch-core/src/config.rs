//! Detector configuration
//!
//! `DetectorConfig` is an immutable value handed to the detector at
//! construction. It can be built in code or loaded from TOML.
//!
//! ## Configuration Resolution
//!
//! Config is loaded with a layered resolution:
//! 1. An explicit path, if given (must exist)
//! 2. Override in data dir (~/.local/share/leakwatch/config/detector.toml)
//! 3. Embedded defaults (compiled into binary)
//!
//! `LEAKWATCH_*` environment variables are applied on top of whichever file
//! was used.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/detector.toml");

pub const ENV_MIN_OCCURRENCES: &str = "LEAKWATCH_MIN_OCCURRENCES";
pub const ENV_WINDOW_DAYS: &str = "LEAKWATCH_WINDOW_DAYS";
pub const ENV_MAX_AMOUNT: &str = "LEAKWATCH_MAX_AMOUNT";
pub const ENV_MIN_CONFIDENCE: &str = "LEAKWATCH_MIN_CONFIDENCE";

/// Detection thresholds
///
/// The detector uses these exactly as given. Out-of-range values do not
/// panic; they just make detection reject more (e.g. a confidence
/// threshold above 1.0 rejects every pattern). Use [`validate`] to catch
/// them at the edge.
///
/// [`validate`]: DetectorConfig::validate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Fewest same-merchant transactions before a pattern is considered
    pub minimum_occurrences: usize,
    /// Informational: the caller trims history to this many days
    pub analysis_window_days: u32,
    /// Groups averaging more than this are not micro-spend
    pub max_amount_for_micro_spend: f64,
    /// Patterns scoring below this are dropped (0.0 - 1.0)
    pub min_confidence_threshold: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            minimum_occurrences: 4,
            analysis_window_days: 90,
            max_amount_for_micro_spend: 50.0,
            min_confidence_threshold: 0.6,
        }
    }
}

impl DetectorConfig {
    pub fn with_minimum_occurrences(mut self, value: usize) -> Self {
        self.minimum_occurrences = value;
        self
    }

    pub fn with_analysis_window_days(mut self, value: u32) -> Self {
        self.analysis_window_days = value;
        self
    }

    pub fn with_max_amount(mut self, value: f64) -> Self {
        self.max_amount_for_micro_spend = value;
        self
    }

    pub fn with_min_confidence(mut self, value: f64) -> Self {
        self.min_confidence_threshold = value;
        self
    }

    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load using the layered resolution described in the module docs
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = load_file_layer(explicit_path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `LEAKWATCH_*` overrides from a variable source
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_MIN_OCCURRENCES) {
            self.minimum_occurrences = parse_override(ENV_MIN_OCCURRENCES, &v)?;
        }
        if let Some(v) = lookup(ENV_WINDOW_DAYS) {
            self.analysis_window_days = parse_override(ENV_WINDOW_DAYS, &v)?;
        }
        if let Some(v) = lookup(ENV_MAX_AMOUNT) {
            self.max_amount_for_micro_spend = parse_override(ENV_MAX_AMOUNT, &v)?;
        }
        if let Some(v) = lookup(ENV_MIN_CONFIDENCE) {
            self.min_confidence_threshold = parse_override(ENV_MIN_CONFIDENCE, &v)?;
        }
        Ok(())
    }

    /// Reject values the detector would accept but that are almost
    /// certainly mistakes
    pub fn validate(&self) -> Result<()> {
        if self.minimum_occurrences < 2 {
            return Err(Error::Config(format!(
                "minimum_occurrences must be at least 2 (got {})",
                self.minimum_occurrences
            )));
        }
        if !self.max_amount_for_micro_spend.is_finite() || self.max_amount_for_micro_spend <= 0.0
        {
            return Err(Error::Config(format!(
                "max_amount_for_micro_spend must be a positive number (got {})",
                self.max_amount_for_micro_spend
            )));
        }
        if !(0.0..=1.0).contains(&self.min_confidence_threshold) {
            return Err(Error::Config(format!(
                "min_confidence_threshold must be between 0 and 1 (got {})",
                self.min_confidence_threshold
            )));
        }
        Ok(())
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("leakwatch").join("config").join("detector.toml"))
}

fn load_file_layer(explicit_path: Option<&Path>) -> Result<DetectorConfig> {
    if let Some(path) = explicit_path {
        debug!("Loading detector config from {}", path.display());
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        return DetectorConfig::from_toml_str(&content);
    }

    if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            debug!("Loading detector config override from {}", default_path.display());
            let content = fs::read_to_string(&default_path)?;
            return DetectorConfig::from_toml_str(&content);
        }
    }

    DetectorConfig::from_toml_str(DEFAULT_CONFIG)
}

fn parse_override<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{} has an invalid value: {:?}", key, value)))
}
