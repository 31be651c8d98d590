// Property-based checks for the resolver's result invariants.
// PROPTEST_CASES overrides the case count.

mod common;

use std::collections::{BTreeSet, HashSet};

use common::{reg, src};
use entity_matcher::matching::{Resolution, ResolveConfig, Resolver};
use entity_matcher::models::{Confidence, MatchMethod, RegistryRecord, SourceRecord, EXACT_SCORE, HIGH_CONFIDENCE_SCORE};
use entity_matcher::normalize::normalize_identifier;
use entity_matcher::providers::InMemoryRegistry;
use proptest::prelude::*;

const WORDS: &[&str] = &["acme", "widgets", "harbour", "coastal", "mining", "logistics", "bakery", "pty", "ltd", "group"];
const POSTCODES: &[&str] = &["2000", "3000", "4000", ""];

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES").ok().and_then(|s| s.parse().ok()).unwrap_or(64),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

fn arb_name() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(WORDS), 1..4).prop_map(|w| w.join(" "))
}

fn arb_postcode() -> impl Strategy<Value = String> {
    prop::sample::select(POSTCODES).prop_map(str::to_string)
}

fn arb_source() -> impl Strategy<Value = Vec<SourceRecord>> {
    prop::collection::vec(
        (0u8..12, arb_name(), prop::option::of(0u8..15), arb_postcode()),
        0..12,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .map(|(d, name, id, pc)| SourceRecord {
                domain: format!("site{d}.com.au"),
                name,
                id_candidate: id.map(|i| format!("10 {i:03}")),
                postcode: pc,
            })
            .collect()
    })
}

fn arb_registry() -> impl Strategy<Value = Vec<RegistryRecord>> {
    prop::collection::vec((0u8..15, arb_name(), arb_postcode()), 0..16).prop_map(|rows| {
        rows.into_iter().map(|(id, name, pc)| reg(&format!("10{id:03}"), &name.to_uppercase(), &pc)).collect()
    })
}

fn run(source: Vec<SourceRecord>, registry: &InMemoryRegistry, cfg: ResolveConfig) -> Resolution {
    let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
    rt.block_on(Resolver::new(cfg).resolve_pool(source, registry, |_| {})).unwrap()
}

proptest! {
    #![proptest_config(config())]

    #[test]
    fn every_record_ends_up_in_exactly_one_place(source in arb_source(), registry in arb_registry(), chunk in 1usize..6) {
        let reg = InMemoryRegistry::new(registry, &source);
        let domains: BTreeSet<String> = source.iter().map(|s| s.domain.clone()).collect();
        let res = run(source, &reg, ResolveConfig { chunk_size: chunk, ..Default::default() });

        let matched: Vec<&str> = res.matches.iter().map(|m| m.source_domain.as_str()).collect();
        let matched_set: HashSet<&str> = matched.iter().copied().collect();
        prop_assert_eq!(matched.len(), matched_set.len(), "a record was matched twice");

        let unresolved: HashSet<&str> = res.unresolved.iter().map(|s| s.domain.as_str()).collect();
        prop_assert!(matched_set.is_disjoint(&unresolved));
        let all: BTreeSet<String> = matched_set.union(&unresolved).map(|s| s.to_string()).collect();
        prop_assert_eq!(all, domains);
        prop_assert_eq!(res.stats.total_matches(), res.matches.len());
    }

    #[test]
    fn scores_respect_threshold_and_bands(source in arb_source(), registry in arb_registry(), threshold in 50.0f64..99.0) {
        let reg = InMemoryRegistry::new(registry.clone(), &source);
        let sources = source.clone();
        let res = run(source, &reg, ResolveConfig { chunk_size: 4, fuzzy_threshold: threshold, ..Default::default() });

        for m in &res.matches {
            match m.method {
                MatchMethod::Exact => {
                    prop_assert_eq!(m.score, EXACT_SCORE);
                    prop_assert_eq!(m.confidence, Confidence::High);
                }
                MatchMethod::Fuzzy => {
                    prop_assert!(m.score >= threshold && m.score < EXACT_SCORE);
                    let want = if m.score >= HIGH_CONFIDENCE_SCORE { Confidence::High } else { Confidence::Medium };
                    prop_assert_eq!(m.confidence, want);
                    // Fuzzy candidates always share the record's postcode.
                    let s = sources.iter().find(|s| s.domain == m.source_domain).unwrap();
                    prop_assert!(!s.postcode.is_empty());
                    prop_assert_eq!(&m.registry_postcode, &s.postcode);
                }
                MatchMethod::Llm => prop_assert!(false, "disambiguation was not enabled"),
            }
        }

        // A record whose identifier is in the register is always an identifier match.
        let ids: HashSet<String> = registry.iter().map(|r| normalize_identifier(&r.registry_id)).collect();
        let mut seen = HashSet::new();
        for s in sources.iter().filter(|s| seen.insert(s.domain.clone())) {
            if let Some(id) = &s.id_candidate {
                if ids.contains(&normalize_identifier(id)) {
                    let m = res.matches.iter().find(|m| m.source_domain == s.domain);
                    prop_assert_eq!(m.map(|m| m.method), Some(MatchMethod::Exact));
                }
            }
        }
    }
}

#[test]
fn chunk_size_does_not_change_unique_candidate_results() {
    let names = ["Harbour Bakery", "Coastal Mining", "Inland Logistics", "Northern Orchards", "Southern Freight"];
    let source: Vec<SourceRecord> = names
        .iter()
        .enumerate()
        .map(|(i, n)| src(&format!("s{i}.com.au"), &format!("{n} Pty Ltd"), None, "2000"))
        .collect();
    let mut registry: Vec<RegistryRecord> = names
        .iter()
        .enumerate()
        .map(|(i, n)| reg(&format!("{}", 50 - i * 7), &format!("{} PTY LTD", n.to_uppercase()), "2000"))
        .collect();
    registry.push(reg("90", "UNRELATED VENTURES", "2000"));
    registry.push(reg("91", "HARBOUR BAKERY PTY LTD", "3000"));

    let outcome = |chunk: usize| {
        let reg = InMemoryRegistry::new(registry.clone(), &source);
        let res = run(source.clone(), &reg, ResolveConfig { chunk_size: chunk, ..Default::default() });
        let mut pairs: Vec<(String, String)> = res.matches.into_iter().map(|m| (m.source_domain, m.registry_id)).collect();
        pairs.sort();
        pairs
    };
    let baseline = outcome(1000);
    assert_eq!(baseline.len(), names.len());
    for chunk in [1, 2, 3, 7] {
        assert_eq!(outcome(chunk), baseline, "chunk size {chunk}");
    }
}
