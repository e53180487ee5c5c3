//! Merchant normalization preview

use anyhow::Result;
use leakwatch_core::normalize_merchant;

/// Pair each raw name with its grouping key
pub fn normalize_names(names: &[String]) -> Vec<(String, String)> {
    names
        .iter()
        .map(|name| (name.clone(), normalize_merchant(name)))
        .collect()
}

pub fn cmd_normalize(names: &[String]) -> Result<()> {
    let pairs = normalize_names(names);
    let width = pairs
        .iter()
        .map(|(raw, _)| raw.chars().count())
        .max()
        .unwrap_or(0);

    for (raw, key) in &pairs {
        println!("  {:<width$}  →  {}", raw, key, width = width);
    }

    Ok(())
}
