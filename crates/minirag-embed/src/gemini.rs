//! Google Gemini embeddings over REST (`embedContent` / `batchEmbedContents`).
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use minirag_core::config::{ApiKeys, EmbeddingSettings, NetworkSettings};
use minirag_core::error::ensure_dimension;
use minirag_core::http::ServiceClient;
use minirag_core::traits::Embedder;
use minirag_core::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    RetrievalDocument,
    RetrievalQuery,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: TaskType,
}

#[derive(Debug, Serialize)]
struct BatchRequest<'a> {
    requests: Vec<EmbedRequest<'a>>,
}

#[derive(Debug, Deserialize)]
struct Values {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct SingleResponse {
    embedding: Values,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    #[serde(default)]
    embeddings: Vec<Values>,
}

pub struct GeminiEmbedder {
    client: ServiceClient,
    api_key: String,
    model: String,
    base_url: String,
    dim: usize,
    batch_size: usize,
    model_id: String,
}

impl GeminiEmbedder {
    pub fn new(settings: &EmbeddingSettings, network: &NetworkSettings, keys: &ApiKeys) -> Result<Self> {
        let api_key = ApiKeys::require(&keys.google_api_key, "GOOGLE_API_KEY")?;
        let client = ServiceClient::new("gemini-embedding", network, Error::EmbeddingService)?;
        Ok(Self {
            client,
            api_key,
            model: normalize_model(&settings.model),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            dim: settings.dimension,
            batch_size: settings.batch_size.max(1),
            model_id: format!("gemini:{}", settings.model),
        })
    }

    fn url(&self, method: &str) -> String { format!("{}/v1beta/{}:{}", self.base_url, self.model, method) }

    fn check(&self, vector: Vec<f32>) -> Result<Vec<f32>> {
        ensure_dimension(vector.len(), self.dim)?;
        Ok(vector)
    }
}

/// The API expects `models/<name>`; accept a bare name too.
fn normalize_model(model: &str) -> String {
    if model.starts_with("models/") { model.to_string() } else { format!("models/{model}") }
}

fn request<'a>(model: &'a str, text: &'a str, task_type: TaskType) -> EmbedRequest<'a> {
    EmbedRequest { model, content: Content { parts: [Part { text }] }, task_type }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    fn model_id(&self) -> &str { &self.model_id }

    fn dim(&self) -> usize { self.dim }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = request(&self.model, text, TaskType::RetrievalQuery);
        let req = self.client.http().post(self.url("embedContent")).header("x-goog-api-key", &self.api_key).json(&body);
        let resp: SingleResponse = self.client.send_json(req).await?;
        self.check(resp.embedding.values)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let body = BatchRequest {
                requests: batch.iter().map(|t| request(&self.model, t, TaskType::RetrievalDocument)).collect(),
            };
            let req = self
                .client
                .http()
                .post(self.url("batchEmbedContents"))
                .header("x-goog-api-key", &self.api_key)
                .json(&body);
            let resp: BatchResponse = self.client.send_json(req).await?;
            if resp.embeddings.len() != batch.len() {
                return Err(self.client.error(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    resp.embeddings.len()
                )));
            }
            for e in resp.embeddings {
                out.push(self.check(e.values)?);
            }
            debug!(batch = batch.len(), total = out.len(), "embedded batch");
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_matches_api_shape() {
        let body = BatchRequest { requests: vec![request("models/embedding-001", "hi", TaskType::RetrievalDocument)] };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"requests": [{
                "model": "models/embedding-001",
                "content": {"parts": [{"text": "hi"}]},
                "taskType": "RETRIEVAL_DOCUMENT"
            }]})
        );
    }

    #[test]
    fn responses_decode() {
        let single: SingleResponse = serde_json::from_str(r#"{"embedding":{"values":[0.1,0.2]}}"#).unwrap();
        assert_eq!(single.embedding.values, vec![0.1, 0.2]);
        let batch: BatchResponse = serde_json::from_str(r#"{"embeddings":[{"values":[1.0]},{"values":[2.0]}]}"#).unwrap();
        assert_eq!(batch.embeddings.len(), 2);
    }

    #[test]
    fn bare_model_names_are_prefixed() {
        assert_eq!(normalize_model("embedding-001"), "models/embedding-001");
        assert_eq!(normalize_model("models/text-embedding-004"), "models/text-embedding-004");
    }

    #[test]
    fn missing_key_is_a_config_error() {
        let err = GeminiEmbedder::new(&EmbeddingSettings::default(), &NetworkSettings::default(), &ApiKeys::default());
        assert!(matches!(err, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn wrong_width_vectors_are_rejected() {
        let keys = ApiKeys { google_api_key: Some("k".into()), ..Default::default() };
        let e = GeminiEmbedder::new(&EmbeddingSettings::default(), &NetworkSettings::default(), &keys).unwrap();
        assert!(matches!(e.check(vec![0.0; 1024]), Err(Error::DimensionMismatch { supplied: 1024, expected: 768 })));
    }
}
