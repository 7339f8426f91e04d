// 🔎 Filter Evaluator
// Narrows the ledger to the displayed subset. Active keys are OR-ed
// together; "all" short-circuits everything else.

use crate::transaction::{Transaction, POT_CATEGORY};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FilterKey {
    All,
    Excluded,
    Uncategorized,
    Categorized,
    UnlinkedPot,
    /// Literal category, stored lower-cased
    Category(String),
}

impl FilterKey {
    /// Reserved keys are matched case-insensitively; anything else is a
    /// category name.
    pub fn parse(key: &str) -> Self {
        let key = key.trim().to_lowercase();
        match key.as_str() {
            "all" | "all (active)" => FilterKey::All,
            "excluded" => FilterKey::Excluded,
            "uncategorized" => FilterKey::Uncategorized,
            "categorized" => FilterKey::Categorized,
            "unlinked pot" => FilterKey::UnlinkedPot,
            _ => FilterKey::Category(key),
        }
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        match self {
            FilterKey::All => true,
            FilterKey::Excluded => tx.excluded(),
            FilterKey::Uncategorized => tx.category().is_empty(),
            FilterKey::Categorized => !tx.category().is_empty(),
            FilterKey::UnlinkedPot => tx.category() == POT_CATEGORY && tx.link().is_none(),
            FilterKey::Category(name) => tx.category().to_lowercase() == *name,
        }
    }

    /// Labels offered by a filter picker before the ledger's own categories.
    pub fn reserved_labels() -> [&'static str; 5] {
        ["All", "Excluded", "Uncategorized", "Categorized", "Unlinked Pot"]
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterKey::All => write!(f, "all"),
            FilterKey::Excluded => write!(f, "excluded"),
            FilterKey::Uncategorized => write!(f, "uncategorized"),
            FilterKey::Categorized => write!(f, "categorized"),
            FilterKey::UnlinkedPot => write!(f, "unlinked pot"),
            FilterKey::Category(name) => write!(f, "{}", name),
        }
    }
}

/// Active filter keys. An empty set shows nothing; `{all}` shows everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSet {
    keys: BTreeSet<FilterKey>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        [FilterKey::All].into_iter().collect()
    }

    pub fn parse<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        keys.into_iter().map(|k| FilterKey::parse(k.as_ref())).collect()
    }

    pub fn insert(&mut self, key: FilterKey) -> bool {
        self.keys.insert(key)
    }

    pub fn remove(&mut self, key: &FilterKey) -> bool {
        self.keys.remove(key)
    }

    /// Add the key if absent, remove it if present. Returns whether it is now active.
    pub fn toggle(&mut self, key: FilterKey) -> bool {
        if self.keys.remove(&key) {
            false
        } else {
            self.keys.insert(key);
            true
        }
    }

    pub fn contains(&self, key: &FilterKey) -> bool {
        self.keys.contains(key)
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &FilterKey> {
        self.keys.iter()
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        if self.keys.contains(&FilterKey::All) {
            return true;
        }
        self.keys.iter().any(|k| k.matches(tx))
    }
}

impl FromIterator<FilterKey> for FilterSet {
    fn from_iter<I: IntoIterator<Item = FilterKey>>(iter: I) -> Self {
        FilterSet {
            keys: iter.into_iter().collect(),
        }
    }
}

/// Ordered subsequence of `transactions` that pass `filters`.
pub fn apply_filters<'a>(transactions: &'a [Transaction], filters: &FilterSet) -> Vec<&'a Transaction> {
    transactions.iter().filter(|t| filters.matches(t)).collect()
}
