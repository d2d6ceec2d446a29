use std::time::Duration;

use thiserror::Error;

use crate::types::ChunkId;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Chunking failed: an indivisible unit of length {unit_len} exceeds the chunk size {chunk_size}")]
    Chunking { unit_len: usize, chunk_size: usize },

    #[error("Embedding service error: {0}")]
    EmbeddingService(String),

    /// Message shape is relied on by callers; keep it verbatim.
    #[error("Vector dimension {supplied} does not match the dimension of the index {expected}")]
    DimensionMismatch { supplied: usize, expected: usize },

    #[error("Failed to load document: {0}")]
    DocumentLoad(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Re-ranking service error: {0}")]
    Rerank(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("{service} call timed out after {}s", .after.as_secs())]
    Timeout { service: &'static str, after: Duration },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Ingestion stopped after {} of {total} chunks: {cause}", .upserted.len())]
    PartialIngest { upserted: Vec<ChunkId>, total: usize, cause: Box<Error> },
}

/// Coarse classification used by boundary layers to pick a user-visible outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Chunking,
    EmbeddingService,
    DimensionMismatch,
    DocumentLoad,
    VectorStore,
    Rerank,
    Generation,
    Timeout,
    InvalidConfig,
    InvalidInput,
}

impl Error {
    /// Kind of the underlying failure. A partial ingest reports the kind of its cause.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Chunking { .. } => ErrorKind::Chunking,
            Error::EmbeddingService(_) => ErrorKind::EmbeddingService,
            Error::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            Error::DocumentLoad(_) => ErrorKind::DocumentLoad,
            Error::VectorStore(_) => ErrorKind::VectorStore,
            Error::Rerank(_) => ErrorKind::Rerank,
            Error::Generation(_) => ErrorKind::Generation,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::InvalidConfig(_) => ErrorKind::InvalidConfig,
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::PartialIngest { cause, .. } => cause.kind(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Fails with [`Error::DimensionMismatch`] when `supplied` differs from the index dimension.
pub fn ensure_dimension(supplied: usize, expected: usize) -> Result<()> {
    if supplied == expected {
        Ok(())
    } else {
        Err(Error::DimensionMismatch { supplied, expected })
    }
}

/// Runs `fut` under a deadline, turning an elapsed deadline into [`Error::Timeout`].
pub async fn with_timeout<T, F>(service: &'static str, after: Duration, fut: F) -> Result<T>
where
    F: std::future::Future<Output = Result<T>>,
{
    match tokio::time::timeout(after, fut).await {
        Ok(res) => res,
        Err(_) => Err(Error::Timeout { service, after }),
    }
}
