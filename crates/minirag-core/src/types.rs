//! Domain types shared by every stage of the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

pub type ChunkId = String;

/// Raw source text awaiting ingestion.
///
/// - `source`: file name or caller-supplied label, used in citations
/// - `text`: the full document text
/// - `page_starts`: byte offsets where pages 2.. begin; empty for unpaged text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub source: String,
    pub text: String,
    pub page_starts: Vec<usize>,
}

impl Document {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self { source: source.into(), text: text.into(), page_starts: Vec::new() }
    }

    /// Builds a paged document from text where pages are separated by form feeds
    /// (the layout `pdftotext` produces).
    pub fn from_paged_text(source: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let page_starts = text
            .char_indices()
            .filter(|(_, c)| *c == '\u{c}')
            .map(|(i, _)| i + 1)
            .filter(|&start| start < text.len())
            .collect();
        Self { source: source.into(), text, page_starts }
    }

    pub fn is_paged(&self) -> bool { !self.page_starts.is_empty() }

    /// 1-based page holding byte `offset`, or `None` for unpaged documents.
    pub fn page_at(&self, offset: usize) -> Option<u32> {
        if !self.is_paged() { return None; }
        let preceding = self.page_starts.iter().take_while(|&&s| s <= offset).count();
        u32::try_from(preceding + 1).ok()
    }
}

/// A contiguous span of a document that is independently embedded and indexed.
///
/// `start..end` are byte offsets into the source document text and `text` is
/// exactly that slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub source: String,
    pub text: String,
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub page: Option<u32>,
}

impl Chunk {
    pub fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor { source: self.source.clone(), page: self.page, chunk_index: self.index }
    }
}

/// Human-readable pointer back to where a chunk came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub source: String,
    pub page: Option<u32>,
    pub chunk_index: usize,
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.page {
            Some(page) => write!(f, "Page {} of {}", page, self.source),
            None => write!(f, "{} (section {})", self.source, self.chunk_index + 1),
        }
    }
}

/// A chunk paired with its embedding, as written to a vector store.
#[derive(Debug, Clone)]
pub struct IndexedRecord {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// Raw nearest-neighbour hit. Carries the stored vector so that diversity
/// selection can compare candidates with each other.
#[derive(Debug, Clone)]
pub struct Neighbor {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
    pub score: f32,
}

/// Output of vector search. `score` is similarity to the query, higher is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedCandidate {
    pub chunk: Chunk,
    pub score: f32,
}

/// A retrieved candidate with the relevance score assigned by a re-ranker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankedCandidate {
    pub candidate: RetrievedCandidate,
    pub relevance: f32,
}

impl RerankedCandidate {
    pub fn chunk(&self) -> &Chunk { &self.candidate.chunk }
}

/// How the vector store picks results.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SearchMode {
    /// Top results by raw similarity.
    Similarity,
    /// Maximal marginal relevance over the `fetch_k` nearest neighbours.
    Diverse { lambda: f32 },
}

/// One entry of an answer's source list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// The `N` used in `[Source ID: N]` markers.
    pub source_id: usize,
    pub chunk_id: ChunkId,
    pub descriptor: SourceDescriptor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    /// Generated text with inline `[Source ID: N]` markers.
    pub text: String,
    /// Distinct cited sources in order of first appearance.
    pub citations: Vec<Citation>,
}

/// Result of a question. Running out of context is a normal outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryOutcome {
    Answered(Answer),
    NoAnswerFound,
}

impl QueryOutcome {
    pub fn answer(&self) -> Option<&Answer> {
        match self {
            QueryOutcome::Answered(a) => Some(a),
            QueryOutcome::NoAnswerFound => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub source: String,
    pub chunk_count: usize,
    pub chunk_ids: Vec<ChunkId>,
}
