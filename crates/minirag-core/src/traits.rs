use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    ChunkId, Document, IndexedRecord, IngestReport, Neighbor, QueryOutcome, RerankedCandidate, RetrievedCandidate,
};

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `gemini:models/embedding-001`).
    fn model_id(&self) -> &str;
    /// Embedding dimensionality (D).
    fn dim(&self) -> usize;
    /// Embed a search query.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
    /// Embed document chunks, one vector per input in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Dimension the index was configured with.
    fn dim(&self) -> usize;
    /// Insert or overwrite records by chunk id.
    async fn upsert(&self, records: &[IndexedRecord]) -> Result<()>;
    /// Up to `limit` stored records nearest to `query`, most similar first.
    async fn nearest(&self, query: &[f32], limit: usize) -> Result<Vec<Neighbor>>;
    async fn delete(&self, ids: &[ChunkId]) -> Result<()>;
    async fn count(&self) -> Result<usize>;
}

#[async_trait]
pub trait Reranker: Send + Sync {
    fn model_id(&self) -> &str;
    /// Reorder `candidates` by relevance to `query` and keep the best `top_n`.
    /// Candidates are returned unchanged apart from the added relevance score.
    async fn rerank(
        &self,
        query: &str,
        candidates: Vec<RetrievedCandidate>,
        top_n: usize,
    ) -> Result<Vec<RerankedCandidate>>;
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn model_id(&self) -> &str;
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Ingestion and question answering, as served over HTTP.
#[async_trait]
pub trait RagEngine: Send + Sync {
    async fn ingest(&self, document: Document) -> Result<IngestReport>;
    async fn query(&self, question: &str) -> Result<QueryOutcome>;
}
