use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};

use super::disambiguation::{DisambiguationOutcome, DisambiguationTier, Disambiguator};
use super::exact::{candidate_ids, ExactMatcher};
use super::{
    BlockingIndex, FuzzyMatcher, MatchAccumulator, ProgressUpdate, Resolution, ResolveConfig, ResolveControl, Scorer,
    Stage, TokenSortRatio,
};
use crate::metrics::{memory_stats_mb, RunStats};
use crate::models::{MatchMethod, MatchResult, SourceRecord};
use crate::providers::{RegistryProvider, SourceProvider};

/// Runs the tiers in priority order: exact identifier, then per registry
/// chunk fuzzy name matching and (optionally) disambiguation.
pub struct Resolver {
    cfg: ResolveConfig,
    fuzzy: FuzzyMatcher,
    disambiguation: Option<DisambiguationTier>,
    ctrl: Option<ResolveControl>,
}

impl Resolver {
    pub fn new(cfg: ResolveConfig) -> Self {
        let fuzzy = FuzzyMatcher::new(cfg.fuzzy_threshold, Arc::new(TokenSortRatio));
        Self { cfg, fuzzy, disambiguation: None, ctrl: None }
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn Scorer>) -> Self {
        self.fuzzy = FuzzyMatcher::new(self.cfg.fuzzy_threshold, scorer);
        self
    }

    pub fn with_disambiguator(mut self, client: Arc<dyn Disambiguator>) -> Self {
        self.disambiguation = Some(DisambiguationTier::new(
            client,
            self.cfg.disambiguation_timeout,
            self.cfg.disambiguation_concurrency,
        ));
        self
    }

    pub fn with_control(mut self, ctrl: ResolveControl) -> Self {
        self.ctrl = Some(ctrl);
        self
    }

    /// Fetches the source pool, then resolves it. A source that cannot be
    /// read fails the run.
    pub async fn run<F>(&self, source: &dyn SourceProvider, registry: &dyn RegistryProvider, on_progress: F) -> Result<Resolution>
    where
        F: Fn(ProgressUpdate),
    {
        let pool = source
            .fetch_all_source_records()
            .await
            .context("Failed to fetch source records")?;
        self.resolve_pool(pool, registry, on_progress).await
    }

    pub async fn resolve_pool<F>(&self, mut pool: Vec<SourceRecord>, registry: &dyn RegistryProvider, on_progress: F) -> Result<Resolution>
    where
        F: Fn(ProgressUpdate),
    {
        let start = Instant::now();
        let mut stats = RunStats::default();

        let before = pool.len();
        let mut seen: HashSet<String> = HashSet::with_capacity(before);
        pool.retain(|s| seen.insert(s.domain.clone()));
        drop(seen);
        stats.duplicate_domains_dropped = before - pool.len();
        stats.source_records = pool.len();
        if stats.duplicate_domains_dropped > 0 {
            log::warn!("Dropped {} source records with a duplicate domain", stats.duplicate_domains_dropped);
        }
        log::info!("Resolving {} source records", pool.len());

        let disambiguation = match (&self.disambiguation, self.cfg.enable_disambiguation) {
            (Some(tier), true) => Some(tier),
            (None, true) => {
                log::warn!("Disambiguation enabled but no disambiguator configured; skipping that tier");
                None
            }
            _ => None,
        };
        let chunk_size = self.cfg.chunk_size.max(1);
        let mut acc = MatchAccumulator::new();

        // Exact identifiers first: an identifier match always beats a name match.
        if !self.cancelled() {
            let ids = candidate_ids(&pool);
            if !ids.is_empty() {
                let registry_hits = registry
                    .lookup_registry_ids(&ids)
                    .await
                    .context("Failed to look up registry identifiers")?;
                let claimed = acc.claim_all(ExactMatcher::new(&registry_hits).match_pool(&pool));
                acc.retain_unresolved(&mut pool);
                log::info!("Exact identifier matches: {} ({} identifiers looked up)", claimed, ids.len());
            }
            on_progress(self.progress(Stage::Exact, 0, 0, 0, &acc, &pool));
        }

        let mut offset = 0usize;
        let mut round = 0usize;
        while !pool.is_empty() && !self.cancelled() {
            let chunk = registry
                .fetch_registry_chunk(offset, chunk_size)
                .await
                .with_context(|| format!("Failed to fetch registry chunk (offset {}, limit {})", offset, chunk_size))?;
            if chunk.is_empty() {
                log::info!("Registry exhausted after {} rounds", round);
                break;
            }
            round += 1;
            let chunk_len = chunk.len();
            stats.registry_rows_read += chunk_len;
            log::info!("Round {}: {} registry rows at offset {}, {} records unresolved", round, chunk_len, offset, pool.len());

            // Indexing and scoring are CPU-bound; keep them off the runtime's workers.
            let t_fuzzy = Instant::now();
            let fuzzy = self.fuzzy.clone();
            let (returned, index, found) = tokio::task::spawn_blocking(move || {
                let index = BlockingIndex::build(chunk);
                let found = fuzzy.match_pool(&pool, &index);
                (pool, index, found)
            })
            .await
            .context("Fuzzy scoring task failed")?;
            pool = returned;
            stats.duplicate_registry_ids_dropped += index.duplicates_dropped();

            let claimed = acc.claim_all(found);
            acc.retain_unresolved(&mut pool);
            log::info!("  fuzzy: {} matches across {} blocks in {:?}", claimed, index.block_count(), t_fuzzy.elapsed());
            on_progress(self.progress(Stage::Fuzzy, round, offset, chunk_len, &acc, &pool));

            if let Some(tier) = disambiguation {
                if !pool.is_empty() && !self.cancelled() {
                    let candidates = Arc::new(index.into_records());
                    let outcomes = tier.run(&pool, candidates.clone(), self.ctrl.as_ref()).await;
                    stats.disambiguation_calls += outcomes.len();

                    let mut hits = Vec::new();
                    for (i, outcome) in outcomes {
                        match outcome {
                            DisambiguationOutcome::Matched(c) => hits.push(MatchResult::llm(&pool[i], &candidates[c])),
                            DisambiguationOutcome::NoMatch => stats.disambiguation_no_match += 1,
                            DisambiguationOutcome::UnknownId(id) => {
                                log::info!("Disambiguation for {} proposed {} which is not a candidate", pool[i].domain, id);
                                stats.disambiguation_unknown_id += 1;
                            }
                            DisambiguationOutcome::Failed(_) => stats.disambiguation_failures += 1,
                        }
                    }
                    let claimed = acc.claim_all(hits);
                    acc.retain_unresolved(&mut pool);
                    log::info!("  disambiguation: {} matches", claimed);
                    on_progress(self.progress(Stage::Disambiguation, round, offset, chunk_len, &acc, &pool));
                }
            }

            offset += chunk_size;
        }

        let cancelled = self.cancelled();
        if cancelled {
            log::warn!("Resolution cancelled; returning {} matches accumulated so far", acc.len());
        }

        stats.rounds = round;
        stats.exact_matches = acc.count(MatchMethod::Exact);
        stats.fuzzy_matches = acc.count(MatchMethod::Fuzzy);
        stats.llm_matches = acc.count(MatchMethod::Llm);
        stats.unresolved = pool.len();
        stats.elapsed = start.elapsed();
        on_progress(self.progress(Stage::Done, round, offset, 0, &acc, &pool));

        Ok(Resolution { matches: acc.into_matches(), unresolved: pool, stats, cancelled })
    }

    fn cancelled(&self) -> bool {
        self.ctrl.as_ref().map(|c| c.is_cancelled()).unwrap_or(false)
    }

    fn progress(&self, stage: Stage, round: usize, offset: usize, chunk_len: usize, acc: &MatchAccumulator, pool: &[SourceRecord]) -> ProgressUpdate {
        let mem = memory_stats_mb();
        ProgressUpdate {
            stage,
            round,
            offset,
            chunk_len,
            matched: acc.len(),
            unresolved: pool.len(),
            mem_used_mb: mem.used_mb,
            mem_avail_mb: mem.avail_mb,
        }
    }
}

/// Resolves `source_pool` against `registry` with default thresholds.
/// Disambiguation runs only when a disambiguator is supplied.
pub async fn resolve(
    source_pool: Vec<SourceRecord>,
    registry: &dyn RegistryProvider,
    chunk_size: usize,
    disambiguator: Option<Arc<dyn Disambiguator>>,
) -> Result<Resolution> {
    let cfg = ResolveConfig { chunk_size, enable_disambiguation: disambiguator.is_some(), ..Default::default() };
    let mut resolver = Resolver::new(cfg);
    if let Some(client) = disambiguator {
        resolver = resolver.with_disambiguator(client);
    }
    resolver.resolve_pool(source_pool, registry, |_| {}).await
}
