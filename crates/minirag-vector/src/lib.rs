//! Vector store adapters and diversity-aware search.
use std::sync::Arc;

use tracing::debug;

use minirag_core::config::{Settings, VectorBackend};
use minirag_core::error::ensure_dimension;
use minirag_core::traits::VectorStore;
use minirag_core::types::{RetrievedCandidate, SearchMode};
use minirag_core::Result;

pub mod lance;
pub mod memory;
pub mod mmr;
pub mod pinecone;
pub mod schema;

pub use lance::LanceVectorStore;
pub use memory::MemoryVectorStore;
pub use pinecone::PineconeVectorStore;

/// Search `store` for `query`.
///
/// `Similarity` returns the `k` nearest records. `Diverse` fetches the
/// `fetch_k` nearest (never fewer than `k`) and keeps `k` of them by maximal
/// marginal relevance. Candidates keep their raw similarity as `score`.
pub async fn search(
    store: &dyn VectorStore,
    query: &[f32],
    mode: SearchMode,
    fetch_k: usize,
    k: usize,
) -> Result<Vec<RetrievedCandidate>> {
    ensure_dimension(query.len(), store.dim())?;
    let hits = match mode {
        SearchMode::Similarity => store.nearest(query, k).await?,
        SearchMode::Diverse { lambda } => {
            let pool = store.nearest(query, fetch_k.max(k)).await?;
            let picks = mmr::maximal_marginal_relevance(query, &pool.iter().map(|n| n.vector.as_slice()).collect::<Vec<_>>(), lambda, k);
            debug!(fetched = pool.len(), selected = picks.len(), lambda, "mmr selection");
            let mut pool: Vec<Option<_>> = pool.into_iter().map(Some).collect();
            picks.into_iter().filter_map(|i| pool[i].take()).collect()
        }
    };
    Ok(hits.into_iter().map(|n| RetrievedCandidate { chunk: n.chunk, score: n.score }).collect())
}

/// Open the configured backend.
pub async fn open_store(settings: &Settings) -> Result<Arc<dyn VectorStore>> {
    let vs = &settings.vector_store;
    match vs.backend {
        VectorBackend::Memory => Ok(Arc::new(MemoryVectorStore::new(vs.dimension))),
        VectorBackend::Lancedb => {
            let path = vs.lancedb_path();
            Ok(Arc::new(LanceVectorStore::open(&path, &vs.table, vs.dimension, settings.network.timeout()).await?))
        }
        VectorBackend::Pinecone => Ok(Arc::new(PineconeVectorStore::connect(vs, &settings.network, &settings.keys).await?)),
    }
}
