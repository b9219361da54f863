//! Canonical-to-local field name maps for edge endpoints.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Maps the canonical quantity name an edge uses to the field name on one
/// endpoint node. Names without an entry resolve to themselves.
///
/// Serialized as a plain map. An omitted map and an empty map mean the same
/// thing; `null` is not a valid map and fails to deserialize.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AliasMap {
    map: BTreeMap<String, String>,
}

impl AliasMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, canonical: impl Into<String>, local: impl Into<String>) -> Self {
        self.map.insert(canonical.into(), local.into());
        self
    }

    /// Node-local name for `canonical`.
    pub fn resolve<'a>(&'a self, canonical: &'a str) -> &'a str {
        self.map.get(canonical).map_or(canonical, String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AliasMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            map: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<const N: usize> From<[(&str, &str); N]> for AliasMap {
    fn from(pairs: [(&str, &str); N]) -> Self {
        pairs.into_iter().collect()
    }
}
