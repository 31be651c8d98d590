#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use entity_matcher::error::DisambiguationError;
use entity_matcher::matching::{Disambiguator, Scorer};
use entity_matcher::models::{RegistryRecord, SourceRecord};

pub fn src(domain: &str, name: &str, id: Option<&str>, postcode: &str) -> SourceRecord {
    SourceRecord { domain: domain.into(), name: name.into(), id_candidate: id.map(str::to_string), postcode: postcode.into() }
}

pub fn reg(id: &str, name: &str, postcode: &str) -> RegistryRecord {
    RegistryRecord {
        registry_id: id.into(),
        name: name.into(),
        entity_type: "Australian Private Company".into(),
        state: "NSW".into(),
        postcode: postcode.into(),
    }
}

/// Scores every non-empty pair the same.
pub struct FixedScorer(pub f64);

impl Scorer for FixedScorer {
    fn key(&self, name: &str) -> String {
        name.trim().to_string()
    }
    fn similarity(&self, a: &str, b: &str) -> f64 {
        if a.is_empty() || b.is_empty() { 0.0 } else { self.0 }
    }
}

pub enum Reply {
    Id(&'static str),
    Nothing,
    Error,
}

/// Gives the same reply for every record and counts calls.
pub struct ScriptedDisambiguator {
    pub reply: Reply,
    pub calls: AtomicUsize,
}

impl ScriptedDisambiguator {
    pub fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self { reply, calls: AtomicUsize::new(0) })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Disambiguator for ScriptedDisambiguator {
    async fn disambiguate(&self, _record: &SourceRecord, _candidates: &[RegistryRecord]) -> Result<Option<String>, DisambiguationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Reply::Id(id) => Ok(Some(id.to_string())),
            Reply::Nothing => Ok(None),
            Reply::Error => Err(DisambiguationError::Service { status: 503, body: "overloaded".into() }),
        }
    }
}

/// Records the postcodes of the candidates it is offered and answers `answer`.
pub struct CandidateSpy {
    pub answer: &'static str,
    pub postcodes: Mutex<BTreeSet<String>>,
}

impl CandidateSpy {
    pub fn new(answer: &'static str) -> Arc<Self> {
        Arc::new(Self { answer, postcodes: Mutex::new(BTreeSet::new()) })
    }

    pub fn postcodes(&self) -> Vec<String> {
        self.postcodes.lock().unwrap().iter().cloned().collect()
    }
}

#[async_trait]
impl Disambiguator for CandidateSpy {
    async fn disambiguate(&self, _record: &SourceRecord, candidates: &[RegistryRecord]) -> Result<Option<String>, DisambiguationError> {
        self.postcodes.lock().unwrap().extend(candidates.iter().map(|c| c.postcode.clone()));
        Ok(Some(self.answer.to_string()))
    }
}

/// Scores 95 once `signal` is set, or 0 if it stays unset for five seconds.
pub struct SignalScorer {
    pub signal: Arc<AtomicBool>,
}

impl Scorer for SignalScorer {
    fn key(&self, name: &str) -> String {
        name.trim().to_string()
    }
    fn similarity(&self, _a: &str, _b: &str) -> f64 {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if self.signal.load(Ordering::SeqCst) {
                return 95.0;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        0.0
    }
}
