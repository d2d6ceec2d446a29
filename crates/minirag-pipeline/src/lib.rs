//! Ingestion and query flows over shared, read-only components.
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use minirag_core::chunker::Chunker;
use minirag_core::config::{RetrievalSettings, Settings};
use minirag_core::error::ensure_dimension;
use minirag_core::traits::{Embedder, LanguageModel, RagEngine, Reranker, VectorStore};
use minirag_core::types::{
    Chunk, ChunkId, Document, IndexedRecord, IngestReport, QueryOutcome, RerankedCandidate, SearchMode,
};
use minirag_core::{Error, Result};
use minirag_generate::AnswerGenerator;

/// The swappable parts of a pipeline.
pub struct Components {
    pub chunker: Chunker,
    pub embedder: Arc<dyn Embedder>,
    pub store: Arc<dyn VectorStore>,
    pub reranker: Arc<dyn Reranker>,
    pub llm: Arc<dyn LanguageModel>,
}

/// Cheap to clone; every clone shares the same components.
#[derive(Clone)]
pub struct RagPipeline {
    chunker: Arc<Chunker>,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    reranker: Arc<dyn Reranker>,
    generator: Arc<AnswerGenerator>,
    retrieval: RetrievalSettings,
    embed_batch_size: usize,
}

impl RagPipeline {
    /// Assemble a pipeline. Fails if the embedder and the store disagree on dimension.
    pub fn new(components: Components, settings: &Settings) -> Result<Self> {
        ensure_dimension(components.embedder.dim(), components.store.dim())?;
        Ok(Self {
            chunker: Arc::new(components.chunker),
            embedder: components.embedder,
            store: components.store,
            reranker: components.reranker,
            generator: Arc::new(AnswerGenerator::new(components.llm)?),
            retrieval: settings.retrieval.clone(),
            embed_batch_size: settings.ingest.embed_batch_size.max(1),
        })
    }

    /// Build every component from configuration.
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        settings.validate()?;
        let components = Components {
            chunker: Chunker::new(&settings.chunking)?,
            embedder: minirag_embed::get_default_embedder(settings)?,
            store: minirag_vector::open_store(settings).await?,
            reranker: minirag_rerank::get_default_reranker(settings)?,
            llm: minirag_generate::get_default_llm(settings)?,
        };
        let pipeline = Self::new(components, settings)?;
        info!(
            embedder = pipeline.embedder.model_id(),
            reranker = pipeline.reranker.model_id(),
            llm = pipeline.generator.model_id(),
            dim = pipeline.store.dim(),
            "pipeline ready"
        );
        Ok(pipeline)
    }

    /// Chunk, embed and upsert a document, one batch at a time.
    ///
    /// Batches already written stay in the store when a later batch fails; the
    /// error then lists their ids.
    pub async fn ingest(&self, document: Document) -> Result<IngestReport> {
        let started = Instant::now();
        let chunks = self.chunker.chunk_document(&document)?;
        let total = chunks.len();
        let mut upserted: Vec<ChunkId> = Vec::with_capacity(total);

        for batch in chunks.chunks(self.embed_batch_size) {
            if let Err(cause) = self.ingest_batch(batch).await {
                warn!(source = %document.source, upserted = upserted.len(), total, error = %cause, "ingestion stopped");
                if upserted.is_empty() {
                    return Err(cause);
                }
                return Err(Error::PartialIngest { upserted, total, cause: Box::new(cause) });
            }
            upserted.extend(batch.iter().map(|c| c.id.clone()));
            debug!(source = %document.source, done = upserted.len(), total, "batch upserted");
        }

        info!(source = %document.source, chunks = total, elapsed_ms = started.elapsed().as_millis() as u64, "ingested document");
        Ok(IngestReport { source: document.source, chunk_count: total, chunk_ids: upserted })
    }

    async fn ingest_batch(&self, batch: &[Chunk]) -> Result<()> {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        if vectors.len() != batch.len() {
            return Err(Error::EmbeddingService(format!(
                "expected {} embeddings, got {}",
                batch.len(),
                vectors.len()
            )));
        }
        let records = batch
            .iter()
            .cloned()
            .zip(vectors)
            .map(|(chunk, vector)| {
                ensure_dimension(vector.len(), self.store.dim())?;
                Ok(IndexedRecord { chunk, vector })
            })
            .collect::<Result<Vec<_>>>()?;
        self.store.upsert(&records).await
    }

    /// Diverse vector search followed by re-ranking.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<RerankedCandidate>> {
        let question = validate_question(question)?;
        let started = Instant::now();
        let query = self.embedder.embed(question).await?;
        let r = &self.retrieval;
        let candidates =
            minirag_vector::search(self.store.as_ref(), &query, SearchMode::Diverse { lambda: r.lambda }, r.fetch_k, r.k).await?;
        let fetched = candidates.len();
        let reranked = self.reranker.rerank(question, candidates, r.top_n).await?;
        info!(candidates = fetched, kept = reranked.len(), elapsed_ms = started.elapsed().as_millis() as u64, "retrieved context");
        Ok(reranked)
    }

    /// Answer a question from the indexed documents.
    pub async fn query(&self, question: &str) -> Result<QueryOutcome> {
        let question = validate_question(question)?;
        let context: Vec<Chunk> = self.retrieve(question).await?.into_iter().map(|r| r.candidate.chunk).collect();
        let started = Instant::now();
        let outcome = self.generator.generate(question, &context).await?;
        let cited = outcome.answer().map_or(0, |a| a.citations.len());
        info!(context = context.len(), cited, elapsed_ms = started.elapsed().as_millis() as u64, "generated answer");
        Ok(outcome)
    }

    pub async fn delete(&self, ids: &[ChunkId]) -> Result<()> {
        self.store.delete(ids).await?;
        info!(deleted = ids.len(), "deleted records");
        Ok(())
    }

    pub async fn count(&self) -> Result<usize> { self.store.count().await }
}

fn validate_question(question: &str) -> Result<&str> {
    let q = question.trim();
    if q.is_empty() {
        return Err(Error::InvalidInput("question must not be blank".into()));
    }
    Ok(q)
}

#[async_trait]
impl RagEngine for RagPipeline {
    async fn ingest(&self, document: Document) -> Result<IngestReport> { RagPipeline::ingest(self, document).await }
    async fn query(&self, question: &str) -> Result<QueryOutcome> { RagPipeline::query(self, question).await }
}
