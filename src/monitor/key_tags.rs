//! Explicit cache-key to metric-tag mapping.
//!
//! Composed cache keys (`schemeSearchCache::abc`) carry a namespace that would
//! otherwise multiply tag cardinality. The mapper resolves a key to its tag
//! through configured overrides and namespace prefixes, so the monitor's
//! counters and the policies' access-count lookups always agree.

use crate::config::KeyTagSettings;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct KeyTagMapper {
    overrides: HashMap<String, String>,
    namespace_prefixes: Vec<String>,
}

impl KeyTagMapper {
    pub fn new(overrides: HashMap<String, String>, namespace_prefixes: Vec<String>) -> Self {
        Self {
            overrides,
            namespace_prefixes,
        }
    }

    pub fn from_settings(settings: &KeyTagSettings) -> Self {
        Self::new(
            settings
                .overrides
                .iter()
                .map(|o| (o.key.clone(), o.tag.clone()))
                .collect(),
            settings.namespace_prefixes.clone(),
        )
    }

    /// Resolve the metric tag for a cache key.
    ///
    /// An explicit override wins, then the first configured prefix that the
    /// key starts with (and is longer than) is stripped, else the key is its
    /// own tag.
    pub fn tag_for<'a>(&'a self, key: &'a str) -> &'a str {
        if let Some(tag) = self.overrides.get(key) {
            return tag;
        }

        self.namespace_prefixes
            .iter()
            .find_map(|prefix| key.strip_prefix(prefix.as_str()).filter(|rest| !rest.is_empty()))
            .unwrap_or(key)
    }
}
