//! Ordered, duplicate-free list of instrument symbols.

use serde::{Deserialize, Serialize};

/// Insertion-ordered set of ticker symbols.
///
/// Symbols are normalized to upper case. Deserializing a list with
/// duplicates keeps the first occurrence of each symbol.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct AssetList(Vec<String>);

impl AssetList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert a symbol at the end. Returns `false` if it was already present.
    pub fn insert(&mut self, symbol: impl AsRef<str>) -> bool {
        let symbol = symbol.as_ref().trim().to_uppercase();
        if symbol.is_empty() || self.contains(&symbol) {
            return false;
        }
        self.0.push(symbol);
        true
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.0.iter().any(|s| s.eq_ignore_ascii_case(symbol))
    }

    /// Set union preserving `self`'s order, then `other`'s new symbols.
    pub fn union(&self, other: &AssetList) -> AssetList {
        let mut merged = self.clone();
        for symbol in other {
            merged.insert(symbol);
        }
        merged
    }

    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn join(&self, sep: &str) -> String {
        self.0.join(sep)
    }
}

impl From<Vec<String>> for AssetList {
    fn from(symbols: Vec<String>) -> Self {
        symbols.into_iter().collect()
    }
}

impl From<AssetList> for Vec<String> {
    fn from(list: AssetList) -> Self {
        list.0
    }
}

impl<S: AsRef<str>> FromIterator<S> for AssetList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut list = AssetList::new();
        for symbol in iter {
            list.insert(symbol);
        }
        list
    }
}

impl<'a> IntoIterator for &'a AssetList {
    type Item = &'a str;
    type IntoIter = std::iter::Map<std::slice::Iter<'a, String>, fn(&'a String) -> &'a str>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter().map(String::as_str)
    }
}
