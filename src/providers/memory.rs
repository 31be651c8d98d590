use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;

use super::{RegistryProvider, SourceProvider};
use crate::models::{RegistryRecord, SourceRecord};
use crate::normalize::{normalize_identifier, normalize_postcode};

#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    records: Vec<SourceRecord>,
}

impl InMemorySource {
    pub fn new(records: Vec<SourceRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl SourceProvider for InMemorySource {
    async fn fetch_all_source_records(&self) -> Result<Vec<SourceRecord>> {
        Ok(self.records.clone())
    }
}

/// Register held in memory, served the way the database serves it: sorted
/// by `registry_id` (stable, so duplicates keep their input order) and
/// restricted to postcodes present in the source set for chunk reads.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegistry {
    all: Vec<RegistryRecord>,
    windowed: Vec<RegistryRecord>,
}

impl InMemoryRegistry {
    pub fn new(mut records: Vec<RegistryRecord>, source: &[SourceRecord]) -> Self {
        records.sort_by(|a, b| a.registry_id.cmp(&b.registry_id));
        let postcodes: HashSet<&str> = source.iter().map(|s| normalize_postcode(&s.postcode)).collect();
        let windowed = records
            .iter()
            .filter(|r| postcodes.contains(normalize_postcode(&r.postcode)))
            .cloned()
            .collect();
        Self { all: records, windowed }
    }

    /// Register without the source-postcode restriction.
    pub fn unfiltered(mut records: Vec<RegistryRecord>) -> Self {
        records.sort_by(|a, b| a.registry_id.cmp(&b.registry_id));
        Self { windowed: records.clone(), all: records }
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }
}

#[async_trait]
impl RegistryProvider for InMemoryRegistry {
    async fn fetch_registry_chunk(&self, offset: usize, limit: usize) -> Result<Vec<RegistryRecord>> {
        Ok(self.windowed.iter().skip(offset).take(limit).cloned().collect())
    }

    async fn lookup_registry_ids(&self, ids: &[String]) -> Result<Vec<RegistryRecord>> {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        Ok(self
            .all
            .iter()
            .filter(|r| wanted.contains(normalize_identifier(&r.registry_id).as_str()))
            .cloned()
            .collect())
    }
}
