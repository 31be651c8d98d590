use serde::{Deserialize, Serialize};

/// Fuzzy scores at or above this band are labelled high confidence.
pub const HIGH_CONFIDENCE_SCORE: f64 = 92.0;
/// Score recorded for every identifier match.
pub const EXACT_SCORE: f64 = 100.0;
/// Flat score recorded for model-assisted matches.
pub const LLM_SCORE: f64 = 95.0;
/// Fuzzy scores never reach the exact-match score.
pub const FUZZY_SCORE_CEILING: f64 = 99.99;

/// Company observed on the web (one per domain).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SourceRecord {
    pub domain: String,
    pub name: String,
    pub id_candidate: Option<String>,
    pub postcode: String,
}

/// Entity from the business register.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RegistryRecord {
    pub registry_id: String,
    pub name: String,
    pub entity_type: String,
    pub state: String,
    pub postcode: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMethod {
    Exact,
    Fuzzy,
    Llm,
}

impl MatchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Fuzzy => "fuzzy",
            Self::Llm => "llm",
        }
    }
}

impl std::fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
}

impl Confidence {
    /// Trust label for a match; depends only on how it was made and its score.
    pub fn for_match(method: MatchMethod, score: f64) -> Self {
        match method {
            MatchMethod::Exact => Self::High,
            MatchMethod::Fuzzy if score >= HIGH_CONFIDENCE_SCORE => Self::High,
            MatchMethod::Fuzzy => Self::Medium,
            MatchMethod::Llm => Self::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One resolved source record and the register entity it was linked to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub source_domain: String,
    pub source_name: String,
    pub source_id_candidate: Option<String>,
    pub registry_id: String,
    pub registry_name: String,
    pub registry_type: String,
    pub registry_state: String,
    pub registry_postcode: String,
    pub method: MatchMethod,
    pub score: f64,
    pub confidence: Confidence,
}

impl MatchResult {
    /// Builds a result whose confidence is derived from `(method, score)`.
    pub fn new(source: &SourceRecord, registry: &RegistryRecord, method: MatchMethod, score: f64) -> Self {
        Self {
            source_domain: source.domain.clone(),
            source_name: source.name.clone(),
            source_id_candidate: source.id_candidate.clone(),
            registry_id: registry.registry_id.clone(),
            registry_name: registry.name.clone(),
            registry_type: registry.entity_type.clone(),
            registry_state: registry.state.clone(),
            registry_postcode: registry.postcode.clone(),
            method,
            score,
            confidence: Confidence::for_match(method, score),
        }
    }

    pub fn exact(source: &SourceRecord, registry: &RegistryRecord) -> Self {
        Self::new(source, registry, MatchMethod::Exact, EXACT_SCORE)
    }

    pub fn fuzzy(source: &SourceRecord, registry: &RegistryRecord, score: f64) -> Self {
        Self::new(source, registry, MatchMethod::Fuzzy, score.min(FUZZY_SCORE_CEILING))
    }

    pub fn llm(source: &SourceRecord, registry: &RegistryRecord) -> Self {
        Self::new(source, registry, MatchMethod::Llm, LLM_SCORE)
    }
}
