//! Record sources consumed by the resolver.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{RegistryRecord, SourceRecord};

pub mod csv_input;
pub mod memory;

pub use csv_input::{load_registry_csv, load_source_csv};
pub use memory::{InMemoryRegistry, InMemorySource};

/// Cleaned web-observed companies.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    async fn fetch_all_source_records(&self) -> Result<Vec<SourceRecord>>;
}

/// Read-only access to the business register.
#[async_trait]
pub trait RegistryProvider: Send + Sync {
    /// Window of the register ordered by `registry_id`, limited to postcodes
    /// present in the source set. An empty window means the register is
    /// exhausted.
    async fn fetch_registry_chunk(&self, offset: usize, limit: usize) -> Result<Vec<RegistryRecord>>;

    /// Register entries whose normalized id is in `ids` (already normalized).
    async fn lookup_registry_ids(&self, ids: &[String]) -> Result<Vec<RegistryRecord>>;
}
