use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use minirag_core::error::ensure_dimension;
use minirag_core::traits::VectorStore;
use minirag_core::types::{ChunkId, IndexedRecord, Neighbor};
use minirag_core::{Error, Result};

use crate::mmr::cosine_similarity;

/// Exact in-process store. Records are keyed by chunk id, so upserts overwrite.
pub struct MemoryVectorStore {
    dim: usize,
    records: RwLock<BTreeMap<ChunkId, IndexedRecord>>,
}

impl MemoryVectorStore {
    pub fn new(dim: usize) -> Self { Self { dim, records: RwLock::new(BTreeMap::new()) } }
}

fn poisoned<T>(_: T) -> Error { Error::VectorStore("memory store lock poisoned".into()) }

#[async_trait]
impl VectorStore for MemoryVectorStore {
    fn dim(&self) -> usize { self.dim }

    async fn upsert(&self, records: &[IndexedRecord]) -> Result<()> {
        for r in records {
            ensure_dimension(r.vector.len(), self.dim)?;
        }
        let mut map = self.records.write().map_err(poisoned)?;
        for r in records {
            map.insert(r.chunk.id.clone(), r.clone());
        }
        Ok(())
    }

    async fn nearest(&self, query: &[f32], limit: usize) -> Result<Vec<Neighbor>> {
        ensure_dimension(query.len(), self.dim)?;
        let map = self.records.read().map_err(poisoned)?;
        let mut hits: Vec<Neighbor> = map
            .values()
            .map(|r| Neighbor { chunk: r.chunk.clone(), vector: r.vector.clone(), score: cosine_similarity(query, &r.vector) })
            .collect();
        // stable sort keeps id order among equal scores
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn delete(&self, ids: &[ChunkId]) -> Result<()> {
        let mut map = self.records.write().map_err(poisoned)?;
        for id in ids {
            map.remove(id);
        }
        Ok(())
    }

    async fn count(&self) -> Result<usize> { Ok(self.records.read().map_err(poisoned)?.len()) }
}
