use std::collections::{BTreeSet, HashMap};

use crate::models::{MatchResult, RegistryRecord, SourceRecord};
use crate::normalize::{identifier_key, normalize_identifier};

/// Identifier equality join between the pool and the register.
pub struct ExactMatcher<'a> {
    by_id: HashMap<String, &'a RegistryRecord>,
}

impl<'a> ExactMatcher<'a> {
    pub fn new(registry: &'a [RegistryRecord]) -> Self {
        let mut by_id = HashMap::with_capacity(registry.len());
        for rec in registry {
            let key = normalize_identifier(&rec.registry_id);
            if key.is_empty() {
                continue;
            }
            by_id.entry(key).or_insert(rec);
        }
        Self { by_id }
    }

    pub fn find(&self, source: &SourceRecord) -> Option<&'a RegistryRecord> {
        let key = identifier_key(source.id_candidate.as_deref())?;
        self.by_id.get(&key).copied()
    }

    /// One exact result per source record whose identifier is in the register.
    pub fn match_pool(&self, pool: &[SourceRecord]) -> Vec<MatchResult> {
        pool.iter()
            .filter_map(|s| self.find(s).map(|r| MatchResult::exact(s, r)))
            .collect()
    }
}

/// Distinct normalized identifiers carried by the pool, sorted.
pub fn candidate_ids(pool: &[SourceRecord]) -> Vec<String> {
    pool.iter()
        .filter_map(|s| identifier_key(s.id_candidate.as_deref()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
