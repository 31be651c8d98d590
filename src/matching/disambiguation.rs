use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::ResolveControl;
use crate::error::DisambiguationError;
use crate::models::{RegistryRecord, SourceRecord};
use crate::normalize::normalize_identifier;

/// External capability that picks one register entity for a record, or none.
///
/// Constructed once per run and shared across concurrent calls.
#[async_trait]
pub trait Disambiguator: Send + Sync {
    /// `Ok(Some(id))` is a proposed `registry_id`, `Ok(None)` a confident
    /// "no match".
    async fn disambiguate(&self, record: &SourceRecord, candidates: &[RegistryRecord]) -> Result<Option<String>, DisambiguationError>;
}

#[derive(Debug)]
pub enum DisambiguationOutcome {
    /// Index of the chosen candidate.
    Matched(usize),
    NoMatch,
    /// The capability answered with an id that is not among the candidates.
    UnknownId(String),
    /// The capability is degraded for this record.
    Failed(DisambiguationError),
}

/// Fans disambiguation calls out over the pool with bounded concurrency and
/// a per-call timeout.
#[derive(Clone)]
pub struct DisambiguationTier {
    client: Arc<dyn Disambiguator>,
    timeout: Duration,
    concurrency: usize,
}

impl DisambiguationTier {
    pub fn new(client: Arc<dyn Disambiguator>, timeout: Duration, concurrency: usize) -> Self {
        Self { client, timeout, concurrency: concurrency.max(1) }
    }

    /// Outcomes as `(pool index, outcome)`, sorted by pool index. Records not
    /// dispatched before cancellation are absent.
    pub async fn run(&self, pool: &[SourceRecord], candidates: Arc<Vec<RegistryRecord>>, ctrl: Option<&ResolveControl>) -> Vec<(usize, DisambiguationOutcome)> {
        let cancelled = || ctrl.map(|c| c.is_cancelled()).unwrap_or(false);
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut set = JoinSet::new();

        for (i, record) in pool.iter().enumerate() {
            if cancelled() {
                log::info!("Disambiguation cancelled after dispatching {} of {} records", i, pool.len());
                break;
            }
            let permit = match permits.clone().acquire_owned().await {
                Ok(p) => p,
                Err(_) => break,
            };
            let client = self.client.clone();
            let candidates = candidates.clone();
            let record = record.clone();
            let timeout = self.timeout;
            set.spawn(async move {
                let _permit = permit;
                let outcome = match tokio::time::timeout(timeout, client.disambiguate(&record, &candidates)).await {
                    Ok(Ok(Some(id))) => classify(&id, &candidates),
                    Ok(Ok(None)) => DisambiguationOutcome::NoMatch,
                    Ok(Err(e)) => DisambiguationOutcome::Failed(e),
                    Err(_) => DisambiguationOutcome::Failed(DisambiguationError::Timeout(timeout)),
                };
                if let DisambiguationOutcome::Failed(e) = &outcome {
                    log::warn!("Disambiguation failed for {}: {}", record.domain, e);
                }
                (i, outcome)
            });
        }

        let mut outcomes = Vec::with_capacity(set.len());
        let mut aborted = false;
        while let Some(joined) = set.join_next().await {
            if !aborted && cancelled() {
                set.abort_all();
                aborted = true;
            }
            match joined {
                Ok(out) => outcomes.push(out),
                Err(e) if e.is_cancelled() => {}
                Err(e) => log::warn!("Disambiguation task failed: {}", e),
            }
        }
        outcomes.sort_by_key(|(i, _)| *i);
        outcomes
    }
}

fn classify(id: &str, candidates: &[RegistryRecord]) -> DisambiguationOutcome {
    let wanted = normalize_identifier(id);
    if wanted.is_empty() {
        return DisambiguationOutcome::NoMatch;
    }
    match candidates.iter().position(|c| normalize_identifier(&c.registry_id) == wanted) {
        Some(i) => DisambiguationOutcome::Matched(i),
        None => DisambiguationOutcome::UnknownId(id.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn s(domain: &str) -> SourceRecord {
        SourceRecord { domain: domain.into(), name: domain.into(), id_candidate: None, postcode: "2000".into() }
    }

    fn r(id: &str) -> RegistryRecord {
        RegistryRecord { registry_id: id.into(), name: format!("ENTITY {id}"), entity_type: "Australian Private Company".into(), state: "NSW".into(), postcode: "2000".into() }
    }

    /// Answers by domain: "hit*" -> "222", "ghost*" -> "999", "slow*" sleeps,
    /// "boom*" errors, anything else -> no match.
    struct Scripted {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Disambiguator for Scripted {
        async fn disambiguate(&self, record: &SourceRecord, _c: &[RegistryRecord]) -> Result<Option<String>, DisambiguationError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            let d = record.domain.as_str();
            let out = if d.starts_with("slow") {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(None)
            } else if d.starts_with("boom") {
                Err(DisambiguationError::Malformed("garbage".into()))
            } else if d.starts_with("hit") {
                Ok(Some(" 222 ".into()))
            } else if d.starts_with("ghost") {
                Ok(Some("999".into()))
            } else {
                Ok(None)
            };
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            out
        }
    }

    fn tier(concurrency: usize) -> (DisambiguationTier, Arc<Scripted>) {
        let client = Arc::new(Scripted { in_flight: AtomicUsize::new(0), peak: AtomicUsize::new(0) });
        (DisambiguationTier::new(client.clone(), Duration::from_millis(200), concurrency), client)
    }

    #[tokio::test]
    async fn outcomes_are_typed_and_ordered() {
        let (tier, _) = tier(4);
        let pool = vec![s("hit.com"), s("ghost.com"), s("nope.com"), s("boom.com"), s("slow.com")];
        let cands = Arc::new(vec![r("111"), r("222")]);
        let out = tier.run(&pool, cands, None).await;
        assert_eq!(out.iter().map(|(i, _)| *i).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
        assert!(matches!(out[0].1, DisambiguationOutcome::Matched(1)));
        assert!(matches!(out[1].1, DisambiguationOutcome::UnknownId(ref id) if id == "999"));
        assert!(matches!(out[2].1, DisambiguationOutcome::NoMatch));
        assert!(matches!(out[3].1, DisambiguationOutcome::Failed(DisambiguationError::Malformed(_))));
        assert!(matches!(out[4].1, DisambiguationOutcome::Failed(DisambiguationError::Timeout(_))));
    }

    #[tokio::test]
    async fn concurrency_is_bounded() {
        let (tier, client) = tier(2);
        let pool: Vec<SourceRecord> = (0..10).map(|i| s(&format!("nope{i}.com"))).collect();
        let out = tier.run(&pool, Arc::new(vec![r("1")]), None).await;
        assert_eq!(out.len(), 10);
        assert!(client.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn cancelled_before_start_dispatches_nothing() {
        let (tier, _) = tier(2);
        let ctrl = ResolveControl::new();
        ctrl.cancel();
        let out = tier.run(&[s("hit.com")], Arc::new(vec![r("222")]), Some(&ctrl)).await;
        assert!(out.is_empty());
    }
}
