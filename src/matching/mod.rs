use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::metrics::RunStats;
use crate::models::{MatchResult, SourceRecord};

pub mod accumulator;
pub mod blocking;
pub mod disambiguation;
pub mod exact;
pub mod fuzzy;
pub mod orchestrator;
pub mod rayon_pool;
pub mod similarity;

pub use accumulator::MatchAccumulator;
pub use blocking::BlockingIndex;
pub use disambiguation::{DisambiguationOutcome, DisambiguationTier, Disambiguator};
pub use exact::ExactMatcher;
pub use fuzzy::{FuzzyMatcher, DEFAULT_FUZZY_THRESHOLD};
pub use orchestrator::{resolve, Resolver};
pub use similarity::{Scorer, TokenSortRatio};

pub const DEFAULT_CHUNK_SIZE: usize = 50_000;

#[derive(Debug, Clone)]
pub struct ResolveConfig {
    /// Registry rows read per round.
    pub chunk_size: usize,
    pub fuzzy_threshold: f64,
    pub enable_disambiguation: bool,
    pub disambiguation_timeout: Duration,
    pub disambiguation_concurrency: usize,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            enable_disambiguation: false,
            disambiguation_timeout: Duration::from_secs(30),
            disambiguation_concurrency: 8,
        }
    }
}

/// Cooperative cancellation shared between the resolver and its caller.
#[derive(Clone, Debug, Default)]
pub struct ResolveControl {
    pub cancel: Arc<AtomicBool>,
}

impl ResolveControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Exact,
    Fuzzy,
    Disambiguation,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Fuzzy => "fuzzy",
            Self::Disambiguation => "disambiguation",
            Self::Done => "done",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ProgressUpdate {
    pub stage: Stage,
    pub round: usize,
    pub offset: usize,
    pub chunk_len: usize,
    pub matched: usize,
    pub unresolved: usize,
    pub mem_used_mb: u64,
    pub mem_avail_mb: u64,
}

/// Outcome of a run: every source record is in exactly one of `matches`
/// (by `source_domain`) or `unresolved`.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub matches: Vec<MatchResult>,
    pub unresolved: Vec<SourceRecord>,
    pub stats: RunStats,
    pub cancelled: bool,
}
