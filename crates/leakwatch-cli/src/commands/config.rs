//! Configuration command and shared config loading

use std::path::Path;

use anyhow::{Context, Result};
use leakwatch_core::config::default_config_path;
use leakwatch_core::DetectorConfig;

/// Load the layered detector config, naming the path on failure
pub fn load_config(config_path: Option<&Path>) -> Result<DetectorConfig> {
    DetectorConfig::load(config_path).with_context(|| match config_path {
        Some(path) => format!("Failed to load config from {}", path.display()),
        None => "Failed to load detector config".to_string(),
    })
}

pub fn cmd_config(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;

    let source = match config_path {
        Some(path) => path.display().to_string(),
        None => match default_config_path() {
            Some(path) if path.exists() => path.display().to_string(),
            _ => "built-in defaults".to_string(),
        },
    };

    println!("# Source: {}", source);
    print!("{}", config.to_toml_string()?);

    if let Err(e) = config.validate() {
        println!();
        println!("# ⚠️  {}", e);
    }

    Ok(())
}
