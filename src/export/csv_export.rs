use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use csv::Writer;

use crate::metrics::RunStats;
use crate::models::{MatchResult, SourceRecord};

const MATCH_HEADERS: [&str; 11] = [
    "source_domain",
    "source_name",
    "source_id_candidate",
    "registry_id",
    "registry_name",
    "registry_type",
    "registry_state",
    "registry_postcode",
    "match_method",
    "match_score",
    "match_confidence",
];

pub fn export_matches_csv(results: &[MatchResult], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut w = Writer::from_path(path).with_context(|| format!("Failed to create {}", path.display()))?;
    w.write_record(MATCH_HEADERS)?;
    for m in results {
        write_match(&mut w, m)?;
    }
    w.flush()?;
    Ok(())
}

fn write_match(w: &mut Writer<File>, m: &MatchResult) -> Result<()> {
    let score = format!("{:.2}", m.score);
    w.write_record([
        m.source_domain.as_str(),
        m.source_name.as_str(),
        m.source_id_candidate.as_deref().unwrap_or(""),
        m.registry_id.as_str(),
        m.registry_name.as_str(),
        m.registry_type.as_str(),
        m.registry_state.as_str(),
        m.registry_postcode.as_str(),
        m.method.as_str(),
        score.as_str(),
        m.confidence.as_str(),
    ])?;
    Ok(())
}

/// Source records left without a match, in the source record layout.
pub fn export_unresolved_csv(unresolved: &[SourceRecord], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut w = Writer::from_path(path).with_context(|| format!("Failed to create {}", path.display()))?;
    for r in unresolved {
        w.serialize(r)?;
    }
    if unresolved.is_empty() {
        w.write_record(["domain", "name", "id_candidate", "postcode"])?;
    }
    w.flush()?;
    Ok(())
}

pub fn write_stats_json(stats: &RunStats, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let json = stats.to_json()?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}
