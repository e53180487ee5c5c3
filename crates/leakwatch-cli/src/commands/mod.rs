//! CLI command implementations
//!
//! - `config` - Print the effective detector configuration
//! - `detect` - Load transactions, run detection, print the report
//! - `normalize` - Show merchant grouping keys

pub mod config;
pub mod detect;
pub mod normalize;

// Re-export command functions for main.rs
pub use config::*;
pub use detect::*;
pub use normalize::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
