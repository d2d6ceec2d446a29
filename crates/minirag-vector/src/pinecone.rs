//! Pinecone data-plane REST adapter.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use minirag_core::config::{ApiKeys, NetworkSettings, VectorStoreSettings};
use minirag_core::error::ensure_dimension;
use minirag_core::http::ServiceClient;
use minirag_core::traits::VectorStore;
use minirag_core::types::{Chunk, ChunkId, IndexedRecord, Neighbor};
use minirag_core::{Error, Result};

const UPSERT_BATCH: usize = 100;
const API_VERSION: &str = "2024-07";

/// Pinecone stores numbers as floats, so positions round-trip through `f64`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RecordMetadata {
    source: String,
    text: String,
    chunk_index: f64,
    start: f64,
    end: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    page: Option<f64>,
}

impl From<&Chunk> for RecordMetadata {
    fn from(c: &Chunk) -> Self {
        Self {
            source: c.source.clone(),
            text: c.text.clone(),
            chunk_index: c.index as f64,
            start: c.start as f64,
            end: c.end as f64,
            page: c.page.map(f64::from),
        }
    }
}

impl RecordMetadata {
    fn into_chunk(self, id: String) -> Chunk {
        Chunk {
            id,
            source: self.source,
            text: self.text,
            index: self.chunk_index as usize,
            start: self.start as usize,
            end: self.end as usize,
            page: self.page.map(|p| p as u32),
        }
    }
}

#[derive(Debug, Serialize)]
struct UpsertVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: RecordMetadata,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<UpsertVector<'a>>,
    namespace: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_values: bool,
    include_metadata: bool,
    namespace: &'a str,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    score: f32,
    #[serde(default)]
    values: Vec<f32>,
    metadata: Option<RecordMetadata>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Serialize)]
struct DeleteRequest<'a> {
    ids: &'a [ChunkId],
    namespace: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamespaceStats {
    #[serde(default)]
    vector_count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexStats {
    dimension: usize,
    #[serde(default)]
    total_vector_count: usize,
    #[serde(default)]
    namespaces: std::collections::HashMap<String, NamespaceStats>,
}

pub struct PineconeVectorStore {
    client: ServiceClient,
    api_key: String,
    host: String,
    namespace: String,
    dim: usize,
}

impl PineconeVectorStore {
    /// Connect and verify that the remote index has dimension `settings.dimension`.
    pub async fn connect(settings: &VectorStoreSettings, network: &NetworkSettings, keys: &ApiKeys) -> Result<Self> {
        let api_key = ApiKeys::require(&keys.pinecone_api_key, "PINECONE_API_KEY")?;
        if settings.pinecone_host.trim().is_empty() {
            return Err(Error::InvalidConfig("vector_store.pinecone_host is not set".into()));
        }
        let host = normalize_host(&settings.pinecone_host);
        let client = ServiceClient::new("pinecone", network, Error::VectorStore)?;
        let store = Self { client, api_key, host, namespace: settings.pinecone_namespace.clone(), dim: settings.dimension };
        let stats = store.stats().await?;
        ensure_dimension(store.dim, stats.dimension)?;
        info!(host = %store.host, dim = stats.dimension, vectors = stats.total_vector_count, "connected to Pinecone index");
        Ok(store)
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .http()
            .post(format!("{}{}", self.host, path))
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    async fn stats(&self) -> Result<IndexStats> {
        self.client.send_json(self.post("/describe_index_stats").json(&serde_json::json!({}))).await
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") { host.to_string() } else { format!("https://{host}") }
}

#[async_trait]
impl VectorStore for PineconeVectorStore {
    fn dim(&self) -> usize { self.dim }

    async fn upsert(&self, records: &[IndexedRecord]) -> Result<()> {
        for r in records {
            ensure_dimension(r.vector.len(), self.dim)?;
        }
        for batch in records.chunks(UPSERT_BATCH) {
            let body = UpsertRequest {
                vectors: batch
                    .iter()
                    .map(|r| UpsertVector { id: &r.chunk.id, values: &r.vector, metadata: RecordMetadata::from(&r.chunk) })
                    .collect(),
                namespace: &self.namespace,
            };
            let resp: UpsertResponse = self.client.send_json(self.post("/vectors/upsert").json(&body)).await?;
            debug!(sent = batch.len(), upserted = resp.upserted_count, "pinecone upsert");
        }
        Ok(())
    }

    async fn nearest(&self, query: &[f32], limit: usize) -> Result<Vec<Neighbor>> {
        ensure_dimension(query.len(), self.dim)?;
        if limit == 0 {
            return Ok(Vec::new());
        }
        let body = QueryRequest { vector: query, top_k: limit, include_values: true, include_metadata: true, namespace: &self.namespace };
        let resp: QueryResponse = self.client.send_json(self.post("/query").json(&body)).await?;
        resp.matches
            .into_iter()
            .map(|m| {
                let metadata = m.metadata.ok_or_else(|| self.client.error(format!("match {} has no metadata", m.id)))?;
                if m.values.len() != self.dim {
                    return Err(self.client.error(format!(
                        "match {} returned {} values, index dimension is {}",
                        m.id,
                        m.values.len(),
                        self.dim
                    )));
                }
                Ok(Neighbor { chunk: metadata.into_chunk(m.id), vector: m.values, score: m.score })
            })
            .collect()
    }

    async fn delete(&self, ids: &[ChunkId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let body = DeleteRequest { ids, namespace: &self.namespace };
        let _: serde_json::Value = self.client.send_json(self.post("/vectors/delete").json(&body)).await?;
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        let stats = self.stats().await?;
        if self.namespace.is_empty() {
            return Ok(stats.total_vector_count);
        }
        Ok(stats.namespaces.get(&self.namespace).map_or(0, |n| n.vector_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_round_trips_through_float_json() {
        let chunk = Chunk {
            id: "x".into(),
            source: "a.pdf".into(),
            text: "hello".into(),
            index: 3,
            start: 10,
            end: 15,
            page: Some(2),
        };
        let json = serde_json::to_string(&RecordMetadata::from(&chunk)).unwrap();
        let back: RecordMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back.into_chunk("x".into()), chunk);
    }

    #[test]
    fn unpaged_chunks_omit_page() {
        let chunk = Chunk { id: "y".into(), source: "a.txt".into(), text: "t".into(), index: 0, start: 0, end: 1, page: None };
        let json = serde_json::to_value(RecordMetadata::from(&chunk)).unwrap();
        assert!(json.get("page").is_none());
    }

    #[test]
    fn query_response_decodes() {
        let raw = r#"{"matches":[{"id":"a","score":0.9,"values":[0.1,0.2],
            "metadata":{"source":"s.txt","text":"t","chunk_index":1.0,"start":0.0,"end":1.0}}],"namespace":""}"#;
        let resp: QueryResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.matches.len(), 1);
        assert_eq!(resp.matches[0].values, vec![0.1, 0.2]);
    }

    #[test]
    fn stats_decode() {
        let raw = r#"{"dimension":768,"indexFullness":0.0,"totalVectorCount":42,"namespaces":{"docs":{"vectorCount":40}}}"#;
        let stats: IndexStats = serde_json::from_str(raw).unwrap();
        assert_eq!(stats.dimension, 768);
        assert_eq!(stats.namespaces["docs"].vector_count, 40);
    }

    #[test]
    fn hosts_get_a_scheme() {
        assert_eq!(normalize_host("idx-abc.svc.pinecone.io/"), "https://idx-abc.svc.pinecone.io");
        assert_eq!(normalize_host("http://localhost:5080"), "http://localhost:5080");
    }
}
