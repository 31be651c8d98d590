//! Run counters for one resolution.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub mod memory;

pub use memory::memory_stats_mb;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub source_records: usize,
    pub duplicate_domains_dropped: usize,
    pub exact_matches: usize,
    pub fuzzy_matches: usize,
    pub llm_matches: usize,
    pub unresolved: usize,
    pub rounds: usize,
    pub registry_rows_read: usize,
    pub duplicate_registry_ids_dropped: usize,
    pub disambiguation_calls: usize,
    pub disambiguation_no_match: usize,
    pub disambiguation_unknown_id: usize,
    pub disambiguation_failures: usize,
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
}

impl RunStats {
    pub fn total_matches(&self) -> usize {
        self.exact_matches + self.fuzzy_matches + self.llm_matches
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn log_summary(&self) {
        log::info!("=== Entity matching summary ===");
        log::info!(
            "Source records: {} ({} duplicate domains dropped)",
            self.source_records, self.duplicate_domains_dropped
        );
        log::info!(
            "Matches: {} total | exact={} fuzzy={} llm={}",
            self.total_matches(), self.exact_matches, self.fuzzy_matches, self.llm_matches
        );
        log::info!(
            "Registry: {} rounds, {} rows read, {} duplicate ids dropped",
            self.rounds, self.registry_rows_read, self.duplicate_registry_ids_dropped
        );
        if self.disambiguation_calls > 0 {
            log::info!(
                "Disambiguation: {} calls | no match={} unknown id={} failed={}",
                self.disambiguation_calls, self.disambiguation_no_match, self.disambiguation_unknown_id, self.disambiguation_failures
            );
        }
        log::info!("Unresolved: {} | elapsed {:?}", self.unresolved, self.elapsed);
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_has_elapsed_in_millis() {
        let stats = RunStats { exact_matches: 2, fuzzy_matches: 1, elapsed: Duration::from_millis(1500), ..Default::default() };
        assert_eq!(stats.total_matches(), 3);
        let v: serde_json::Value = serde_json::from_str(&stats.to_json().unwrap()).unwrap();
        assert_eq!(v["elapsed"], 1500);
        assert_eq!(v["exact_matches"], 2);
    }
}
