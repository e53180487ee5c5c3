//! Spending category mapping
//!
//! Upstream category labels come in many shapes ("FOOD_AND_DRINK",
//! "Coffee Shops", "Rent and Utilities"). They are folded into a small
//! closed set by keyword. The mapping is total: anything unrecognized is
//! `Other`.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Food,
    Transport,
    Shopping,
    Entertainment,
    Subscriptions,
    Utilities,
    Health,
    Income,
    Transfer,
    Other,
}

/// Keyword patterns, checked in order. First match wins.
///
/// Keywords match whole words so "parts" never reads as "arts".
const CATEGORY_PATTERNS: &[(Category, &str)] = &[
    (
        Category::Transfer,
        r"transfers?|loan payments?|zelle|venmo|credit card payments?",
    ),
    (
        Category::Income,
        r"income|payroll|salary|paychecks?|deposits?|interest earned",
    ),
    (
        Category::Subscriptions,
        r"subscriptions?|streaming|software|memberships?|digital services?",
    ),
    (
        Category::Food,
        r"food|restaurants?|dining|coffee|cafes?|grocer\w*|bakery|bakeries|takeout|delivery|drinks?",
    ),
    (
        Category::Transport,
        r"transport\w*|travel|taxis?|rideshare|ride share|gas stations?|fuel|parking|transit|airlines?|tolls?",
    ),
    (
        Category::Entertainment,
        r"entertainment|recreation|movies?|music|games?|gaming|arts|sporting events?",
    ),
    (
        Category::Utilities,
        r"utility|utilities|electric\w*|water|internet|telecom\w*|phones?|cable",
    ),
    (
        Category::Health,
        r"health\w*|medical|pharmacy|pharmacies|fitness|gyms?|doctors?|dental|personal care",
    ),
    (
        Category::Shopping,
        r"shops?|shopping|merchandise|retail|clothing|apparel|department stores?|electronics",
    ),
];

static CATEGORY_MATCHERS: LazyLock<Vec<(Category, Regex)>> = LazyLock::new(|| {
    CATEGORY_PATTERNS
        .iter()
        .map(|(category, words)| {
            let re = Regex::new(&format!(r"\b(?:{})\b", words)).expect("valid regex");
            (*category, re)
        })
        .collect()
});

impl Category {
    /// Map an upstream category label into the closed set
    pub fn from_label(label: &str) -> Self {
        let label = label.to_lowercase().replace(['_', '-'], " ");
        CATEGORY_MATCHERS
            .iter()
            .find(|(_, re)| re.is_match(&label))
            .map_or(Self::Other, |(category, _)| *category)
    }

    /// Same as `from_label`, treating a missing or blank label as `Other`
    pub fn from_optional_label(label: Option<&str>) -> Self {
        match label.map(str::trim) {
            Some(l) if !l.is_empty() => Self::from_label(l),
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Food => "food",
            Self::Transport => "transport",
            Self::Shopping => "shopping",
            Self::Entertainment => "entertainment",
            Self::Subscriptions => "subscriptions",
            Self::Utilities => "utilities",
            Self::Health => "health",
            Self::Income => "income",
            Self::Transfer => "transfer",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
