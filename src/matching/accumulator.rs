use std::collections::HashSet;

use crate::models::{MatchMethod, MatchResult, SourceRecord};

/// Collects tier results and guarantees at most one match per source domain.
#[derive(Debug, Default)]
pub struct MatchAccumulator {
    claimed: HashSet<String>,
    matches: Vec<MatchResult>,
}

impl MatchAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `result` unless its domain is already claimed.
    pub fn claim(&mut self, result: MatchResult) -> bool {
        if self.claimed.contains(&result.source_domain) {
            log::debug!("Ignoring second claim for {} ({})", result.source_domain, result.method);
            return false;
        }
        self.claimed.insert(result.source_domain.clone());
        self.matches.push(result);
        true
    }

    /// Claims a whole tier's results; returns how many were new.
    pub fn claim_all(&mut self, results: impl IntoIterator<Item = MatchResult>) -> usize {
        let mut claimed = 0;
        for r in results {
            if self.claim(r) {
                claimed += 1;
            }
        }
        claimed
    }

    pub fn is_claimed(&self, domain: &str) -> bool {
        self.claimed.contains(domain)
    }

    /// Drops claimed records from the pool, keeping the others in order.
    pub fn retain_unresolved(&self, pool: &mut Vec<SourceRecord>) {
        pool.retain(|s| !self.claimed.contains(&s.domain));
    }

    pub fn matches(&self) -> &[MatchResult] {
        &self.matches
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn count(&self, method: MatchMethod) -> usize {
        self.matches.iter().filter(|m| m.method == method).count()
    }

    pub fn into_matches(self) -> Vec<MatchResult> {
        self.matches
    }
}
