use std::collections::{HashMap, HashSet};

use crate::models::RegistryRecord;
use crate::normalize::{normalize_identifier, normalize_postcode};

/// Registry chunk partitioned by postcode.
///
/// Records keep their chunk order inside each block. A `registry_id` seen
/// twice in the chunk is indexed once (first occurrence wins); records with
/// an empty postcode are kept for disambiguation but belong to no block.
#[derive(Debug, Default)]
pub struct BlockingIndex {
    records: Vec<RegistryRecord>,
    blocks: HashMap<String, Vec<usize>>,
    duplicates_dropped: usize,
}

impl BlockingIndex {
    pub fn build(chunk: Vec<RegistryRecord>) -> Self {
        let mut seen: HashSet<String> = HashSet::with_capacity(chunk.len());
        let mut records = Vec::with_capacity(chunk.len());
        let mut blocks: HashMap<String, Vec<usize>> = HashMap::new();
        let mut duplicates_dropped = 0usize;

        for rec in chunk {
            if !seen.insert(normalize_identifier(&rec.registry_id)) {
                duplicates_dropped += 1;
                continue;
            }
            let idx = records.len();
            let key = normalize_postcode(&rec.postcode);
            if !key.is_empty() {
                blocks.entry(key.to_string()).or_default().push(idx);
            }
            records.push(rec);
        }
        if duplicates_dropped > 0 {
            log::warn!("Dropped {} duplicate registry ids from chunk", duplicates_dropped);
        }
        Self { records, blocks, duplicates_dropped }
    }

    /// Indices into [`records`](Self::records) for a postcode, in chunk order.
    pub fn block(&self, postcode: &str) -> Option<&[usize]> {
        let key = normalize_postcode(postcode);
        if key.is_empty() {
            return None;
        }
        self.blocks.get(key).map(Vec::as_slice)
    }

    pub fn candidates<'a>(&'a self, postcode: &str) -> impl Iterator<Item = &'a RegistryRecord> + 'a {
        self.block(postcode)
            .unwrap_or(&[])
            .iter()
            .map(move |&i| &self.records[i])
    }

    pub fn records(&self) -> &[RegistryRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<RegistryRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn duplicates_dropped(&self) -> usize {
        self.duplicates_dropped
    }
}
