//! Vector-store collaborator contract.
//!
//! Writes are atomic per record; the core keeps no transaction log of its
//! own. Searches return hits ordered by descending similarity.

use crate::records::{DesireRecord, DesireStatus, MemoryRecord, OpinionRecord};
use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// A search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct Scored<T> {
    pub record: T,
    /// Cosine similarity to the query (-1.0 to 1.0)
    pub similarity: f32,
}

#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn store_memory(&self, memory: &MemoryRecord) -> Result<()>;
    async fn search_memories(&self, query: &str, top_k: usize) -> Result<Vec<Scored<MemoryRecord>>>;

    async fn search_opinions(&self, query: &str, top_k: usize)
        -> Result<Vec<Scored<OpinionRecord>>>;
    async fn get_opinion(&self, id: Uuid) -> Result<Option<OpinionRecord>>;
    async fn upsert_opinion(&self, opinion: &OpinionRecord) -> Result<()>;
    async fn delete_opinion(&self, id: Uuid) -> Result<()>;

    async fn search_desires(&self, query: &str, top_k: usize) -> Result<Vec<Scored<DesireRecord>>>;
    async fn get_desire(&self, id: Uuid) -> Result<Option<DesireRecord>>;
    async fn upsert_desire(&self, desire: &DesireRecord) -> Result<()>;
    async fn desires_with_status(&self, status: DesireStatus) -> Result<Vec<DesireRecord>>;
}
