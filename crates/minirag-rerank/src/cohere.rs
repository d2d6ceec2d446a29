//! Cohere `/v1/rerank` client.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use minirag_core::config::{ApiKeys, NetworkSettings, RerankSettings};
use minirag_core::http::ServiceClient;
use minirag_core::traits::Reranker;
use minirag_core::types::{RerankedCandidate, RetrievedCandidate};
use minirag_core::{Error, Result};

use crate::order_and_truncate;

#[derive(Debug, Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: Vec<&'a str>,
    top_n: usize,
    return_documents: bool,
}

#[derive(Debug, Deserialize)]
struct RerankResult {
    index: usize,
    relevance_score: f32,
}

#[derive(Debug, Deserialize)]
struct RerankResponse {
    results: Vec<RerankResult>,
}

pub struct CohereReranker {
    client: ServiceClient,
    api_key: String,
    url: String,
    model: String,
    model_id: String,
}

impl CohereReranker {
    pub fn new(settings: &RerankSettings, network: &NetworkSettings, keys: &ApiKeys) -> Result<Self> {
        let api_key = ApiKeys::require(&keys.cohere_api_key, "COHERE_API_KEY")?;
        Ok(Self {
            client: ServiceClient::new("cohere", network, Error::Rerank)?,
            api_key,
            url: format!("{}/v1/rerank", settings.base_url.trim_end_matches('/')),
            model: settings.model.clone(),
            model_id: format!("cohere:{}", settings.model),
        })
    }
}

/// Attach relevance scores to candidates by result index.
fn apply_results(
    client: &ServiceClient,
    mut candidates: Vec<Option<RetrievedCandidate>>,
    results: Vec<RerankResult>,
) -> Result<Vec<RerankedCandidate>> {
    let total = candidates.len();
    results
        .into_iter()
        .map(|r| {
            let candidate = candidates
                .get_mut(r.index)
                .and_then(Option::take)
                .ok_or_else(|| client.error(format!("result index {} is out of range or repeated ({} documents)", r.index, total)))?;
            Ok(RerankedCandidate { candidate, relevance: r.relevance_score })
        })
        .collect()
}

#[async_trait]
impl Reranker for CohereReranker {
    fn model_id(&self) -> &str { &self.model_id }

    async fn rerank(&self, query: &str, candidates: Vec<RetrievedCandidate>, top_n: usize) -> Result<Vec<RerankedCandidate>> {
        if candidates.is_empty() || top_n == 0 {
            return Ok(Vec::new());
        }
        let body = RerankRequest {
            model: &self.model,
            query,
            documents: candidates.iter().map(|c| c.chunk.text.as_str()).collect(),
            top_n: top_n.min(candidates.len()),
            return_documents: false,
        };
        let req = self.client.http().post(&self.url).bearer_auth(&self.api_key).json(&body);
        let resp: RerankResponse = self.client.send_json(req).await?;
        debug!(candidates = candidates.len(), results = resp.results.len(), "cohere rerank");
        let scored = apply_results(&self.client, candidates.into_iter().map(Some).collect(), resp.results)?;
        Ok(order_and_truncate(scored, top_n))
    }
}
