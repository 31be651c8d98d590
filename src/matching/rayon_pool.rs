//! Scoring pool for fuzzy rounds.
//!
//! Block scoring runs on its own Rayon pool, sized once per process from
//! `ENTITY_MATCHER_RAYON_THREADS` or the machine's core count.

use once_cell::sync::Lazy;
use rayon::ThreadPool;

/// Machines above this many cores keep one back for registry I/O.
const RESERVE_ABOVE_CORES: usize = 16;

static SCORING_POOL: Lazy<ThreadPool> = Lazy::new(|| {
    let cores = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(8);
    let requested = std::env::var("ENTITY_MATCHER_RAYON_THREADS").ok();
    let threads = scoring_threads(requested.as_deref(), cores);
    log::info!("[Scoring] {} threads for fuzzy rounds ({} cores)", threads, cores);

    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("entity-matcher-{}", i))
        .build()
        .expect("Failed to create scoring thread pool")
});

/// Thread count for the scoring pool: an explicit positive request wins,
/// otherwise every core, less one on large machines.
fn scoring_threads(requested: Option<&str>, cores: usize) -> usize {
    if let Some(n) = requested.and_then(|v| v.trim().parse::<usize>().ok()).filter(|&n| n > 0) {
        return n;
    }
    if requested.is_some() {
        log::warn!("Ignoring invalid ENTITY_MATCHER_RAYON_THREADS={:?}", requested);
    }
    let reserved = usize::from(cores > RESERVE_ABOVE_CORES);
    cores.saturating_sub(reserved).max(1)
}

/// Runs `f` on the scoring pool; `par_iter` calls inside it stay there.
pub fn execute<F, R>(f: F) -> R
where
    F: FnOnce() -> R + Send,
    R: Send,
{
    SCORING_POOL.install(f)
}
