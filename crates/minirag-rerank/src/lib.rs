//! Re-rankers behind the [`Reranker`] trait.
use std::sync::Arc;

use tracing::info;

use minirag_core::config::{RerankProviderKind, Settings};
use minirag_core::traits::Reranker;
use minirag_core::types::RerankedCandidate;
use minirag_core::Result;

pub mod cohere;
pub mod lexical;

pub use cohere::CohereReranker;
pub use lexical::LexicalReranker;

/// Build the configured re-ranker.
pub fn get_default_reranker(settings: &Settings) -> Result<Arc<dyn Reranker>> {
    match settings.rerank.provider {
        RerankProviderKind::Cohere => {
            let reranker = CohereReranker::new(&settings.rerank, &settings.network, &settings.keys)?;
            info!(model = %settings.rerank.model, "using Cohere re-ranker");
            Ok(Arc::new(reranker))
        }
        RerankProviderKind::Lexical => {
            info!("using lexical re-ranker");
            Ok(Arc::new(LexicalReranker::default()))
        }
    }
}

/// Sort by relevance, highest first, keeping input order among ties, then keep `top_n`.
pub(crate) fn order_and_truncate(mut scored: Vec<RerankedCandidate>, top_n: usize) -> Vec<RerankedCandidate> {
    scored.sort_by(|a, b| b.relevance.partial_cmp(&a.relevance).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(top_n);
    scored
}
