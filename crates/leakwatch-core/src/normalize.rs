//! Merchant name normalization and grouping
//!
//! Statement strings for the same merchant differ by store number, branch
//! and city ("STARBUCKS #4471", "Starbucks Store 12 - NY"). The normalized
//! form is only a grouping key; buckets keep the raw statement name.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::Transaction;

/// Numbered street fragments: "5th", "42nd st", "3rd avenue"
static STREET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d+(?:st|nd|rd|th)\b(?:\s+(?:street|st|ave|avenue|blvd)\b\.?)?")
        .expect("valid regex")
});

/// Location words with an optional number: "store 12", "loc #3", "branch"
static LOCATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:store|loc|location|branch)\b\.?\s*(?:#?\s*\d+\b)?").expect("valid regex")
});

/// Store/terminal numbers, optionally `#`-prefixed
static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#?\b\d+\b").expect("valid regex"));

/// Trailing " - NY" style state suffix
static STATE_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+-\s*[a-z]{1,3}\s*$").expect("valid regex"));

/// Compute the grouping key for a raw merchant string
///
/// Falls back to the lowercased original when stripping leaves nothing, so
/// unrelated merchants made only of digits don't all collapse into "".
pub fn normalize_merchant(raw: &str) -> String {
    let lower = raw.to_lowercase();

    let stripped = STREET_RE.replace_all(&lower, " ");
    let stripped = LOCATION_RE.replace_all(&stripped, " ");
    let stripped = NUMBER_RE.replace_all(&stripped, " ");
    let stripped = STATE_SUFFIX_RE.replace_all(&stripped, "");

    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    let key = collapsed.trim_matches(|c: char| c == '-' || c == '#' || c.is_whitespace());

    if key.is_empty() {
        lower.trim().to_string()
    } else {
        key.to_string()
    }
}

/// Caller-supplied merchant grouping that overrides normalization
///
/// Maps a canonical name to the raw merchant strings that belong to it.
/// Raw names are matched case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MerchantGroups(BTreeMap<String, Vec<String>>);

impl MerchantGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, canonical: &str, raw_names: Vec<String>) {
        self.0
            .entry(canonical.to_string())
            .or_default()
            .extend(raw_names);
    }

    pub fn with_group(mut self, canonical: &str, raw_names: &[&str]) -> Self {
        self.insert(canonical, raw_names.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }

    /// Lowercased raw name -> canonical name
    ///
    /// When a raw name is listed under several canonical names, the first
    /// canonical name in sort order wins.
    fn lookup(&self) -> HashMap<String, &str> {
        let mut lookup = HashMap::new();
        for (canonical, raws) in &self.0 {
            for raw in raws {
                lookup
                    .entry(raw.trim().to_lowercase())
                    .or_insert(canonical.as_str());
            }
        }
        lookup
    }
}

impl From<BTreeMap<String, Vec<String>>> for MerchantGroups {
    fn from(map: BTreeMap<String, Vec<String>>) -> Self {
        Self(map)
    }
}

/// Identity of a candidate group
///
/// Override groups and normalized groups live in separate namespaces so a
/// canonical name can never accidentally merge with a normalization key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupKey {
    Override(String),
    Normalized(String),
}

impl GroupKey {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Override(s) | Self::Normalized(s) => s,
        }
    }
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bucket transactions by merchant
///
/// Transactions named in `overrides` join that group; everything else is
/// keyed by `normalize_merchant`. Input order is preserved inside a group.
pub fn group_transactions<'a>(
    transactions: &[&'a Transaction],
    overrides: Option<&MerchantGroups>,
) -> BTreeMap<GroupKey, Vec<&'a Transaction>> {
    let lookup = overrides.map(MerchantGroups::lookup).unwrap_or_default();

    let mut groups: BTreeMap<GroupKey, Vec<&'a Transaction>> = BTreeMap::new();
    for tx in transactions {
        let key = match lookup.get(&tx.merchant.trim().to_lowercase()) {
            Some(canonical) => GroupKey::Override(canonical.to_string()),
            None => GroupKey::Normalized(normalize_merchant(&tx.merchant)),
        };
        groups.entry(key).or_default().push(tx);
    }
    groups
}
