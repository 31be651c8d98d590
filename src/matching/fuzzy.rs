use std::sync::Arc;

use rayon::prelude::*;

use super::blocking::BlockingIndex;
use super::rayon_pool;
use super::similarity::{Scorer, TokenSortRatio};
use crate::models::{MatchResult, SourceRecord};

pub const DEFAULT_FUZZY_THRESHOLD: f64 = 80.0;

/// Best-candidate name matching inside a postcode block.
#[derive(Clone)]
pub struct FuzzyMatcher {
    threshold: f64,
    scorer: Arc<dyn Scorer>,
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_FUZZY_THRESHOLD, Arc::new(TokenSortRatio))
    }
}

impl FuzzyMatcher {
    pub fn new(threshold: f64, scorer: Arc<dyn Scorer>) -> Self {
        Self { threshold, scorer }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Scores every pool record against its block and returns the matches,
    /// in pool order. Workers only read `index` and their own records.
    pub fn match_pool(&self, pool: &[SourceRecord], index: &BlockingIndex) -> Vec<MatchResult> {
        if pool.is_empty() || index.is_empty() {
            return Vec::new();
        }
        rayon_pool::execute(|| {
            let keys: Vec<String> = index.records().par_iter().map(|r| self.scorer.key(&r.name)).collect();
            pool.par_iter()
                .filter_map(|s| {
                    self.best_candidate(s, index, &keys)
                        .map(|(i, score)| MatchResult::fuzzy(s, &index.records()[i], score))
                })
                .collect()
        })
    }

    /// Highest-scoring candidate at or above the threshold. Ties go to the
    /// lexicographically smallest `registry_id`.
    fn best_candidate(&self, source: &SourceRecord, index: &BlockingIndex, keys: &[String]) -> Option<(usize, f64)> {
        let block = index.block(&source.postcode)?;
        let source_key = self.scorer.key(&source.name);
        let records = index.records();

        let mut best: Option<(usize, f64)> = None;
        for &i in block {
            let score = self.scorer.similarity(&source_key, &keys[i]);
            best = match best {
                None => Some((i, score)),
                Some((bi, bs)) => {
                    if score > bs || (score == bs && records[i].registry_id < records[bi].registry_id) {
                        Some((i, score))
                    } else {
                        Some((bi, bs))
                    }
                }
            };
        }
        best.filter(|&(_, score)| score >= self.threshold)
    }
}
