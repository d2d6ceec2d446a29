use async_trait::async_trait;

use minirag_core::traits::Reranker;
use minirag_core::types::{RerankedCandidate, RetrievedCandidate};
use minirag_core::Result;

use crate::order_and_truncate;

/// Offline re-ranker: blends vector similarity with query-term overlap.
pub struct LexicalReranker {
    vector_weight: f32,
}

impl Default for LexicalReranker {
    fn default() -> Self { Self { vector_weight: 0.7 } }
}

impl LexicalReranker {
    pub fn new(vector_weight: f32) -> Self { Self { vector_weight: vector_weight.clamp(0.0, 1.0) } }

    fn score(&self, query_words: &[String], candidate: &RetrievedCandidate) -> f32 {
        let text_score = if query_words.is_empty() {
            0.0
        } else {
            let content = candidate.chunk.text.to_lowercase();
            let hits = query_words.iter().filter(|w| content.contains(w.as_str())).count();
            hits as f32 / query_words.len() as f32
        };
        candidate.score * self.vector_weight + text_score * (1.0 - self.vector_weight)
    }
}

fn query_words(query: &str) -> Vec<String> {
    query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 2)
        .map(str::to_lowercase)
        .collect()
}

#[async_trait]
impl Reranker for LexicalReranker {
    fn model_id(&self) -> &str { "lexical" }

    async fn rerank(&self, query: &str, candidates: Vec<RetrievedCandidate>, top_n: usize) -> Result<Vec<RerankedCandidate>> {
        let words = query_words(query);
        let scored = candidates
            .into_iter()
            .map(|c| {
                let relevance = self.score(&words, &c);
                RerankedCandidate { candidate: c, relevance }
            })
            .collect();
        Ok(order_and_truncate(scored, top_n))
    }
}
