use std::time::Duration;

use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::{json, Value};

use minirag_core::config::{ApiKeys, NetworkSettings, VectorBackend, VectorStoreSettings};
use minirag_core::traits::VectorStore;
use minirag_core::types::{Chunk, IndexedRecord};
use minirag_core::{Error, ErrorKind, Result};
use minirag_vector::PineconeVectorStore;

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

async fn connect(host: String, timeout_secs: u64) -> Result<PineconeVectorStore> {
    let settings = VectorStoreSettings { backend: VectorBackend::Pinecone, dimension: 3, pinecone_host: host, ..Default::default() };
    let network = NetworkSettings { timeout_secs, connect_timeout_secs: 1 };
    let keys = ApiKeys { pinecone_api_key: Some("test-key".into()), ..Default::default() };
    PineconeVectorStore::connect(&settings, &network, &keys).await
}

fn stats(dimension: usize) -> Json<Value> { Json(json!({"dimension": dimension, "totalVectorCount": 2, "namespaces": {}})) }

fn metadata() -> Value { json!({"source": "a.txt", "text": "Paris", "chunk_index": 0.0, "start": 0.0, "end": 5.0}) }

/// Index of width 3 whose query results carry `values`.
async fn index_returning(values: Value) -> String {
    let app = Router::new().fallback(move |uri: Uri| {
        let values = values.clone();
        async move {
            match uri.path() {
                "/describe_index_stats" => stats(3).into_response(),
                "/query" => Json(json!({"matches": [{"id": "c0", "score": 0.9, "values": values, "metadata": metadata()}]}))
                    .into_response(),
                "/vectors/upsert" => Json(json!({"upsertedCount": 1})).into_response(),
                _ => Json(json!({})).into_response(),
            }
        }
    });
    serve(app).await
}

#[tokio::test]
async fn query_matches_become_neighbors() {
    let store = connect(index_returning(json!([1.0, 0.0, 0.0])).await, 5).await.expect("connect");
    assert_eq!(store.count().await.expect("count"), 2);
    let hits = store.nearest(&[1.0, 0.0, 0.0], 5).await.expect("nearest");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].chunk.id, "c0");
    assert_eq!(hits[0].chunk.text, "Paris");
    assert_eq!(hits[0].vector, vec![1.0, 0.0, 0.0]);
}

#[tokio::test]
async fn matches_without_full_vectors_are_rejected() {
    for values in [json!([]), json!([1.0, 0.0])] {
        let store = connect(index_returning(values).await, 5).await.expect("connect");
        let err = store.nearest(&[1.0, 0.0, 0.0], 5).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::VectorStore);
    }
}

#[tokio::test]
async fn index_width_is_checked_on_connect() {
    let app = Router::new().fallback(|| async { stats(4) });
    let err = connect(serve(app).await, 5).await.err().expect("mismatch");
    assert!(matches!(err, Error::DimensionMismatch { supplied: 3, expected: 4 }));
}

#[tokio::test]
async fn unauthorized_is_a_vector_store_error() {
    let app = Router::new().fallback(|| async { (StatusCode::UNAUTHORIZED, "Invalid API Key").into_response() });
    let err = connect(serve(app).await, 5).await.err().expect("unauthorized");
    assert_eq!(err.kind(), ErrorKind::VectorStore);
    assert!(err.to_string().contains("401"));
}

#[tokio::test]
async fn slow_upsert_times_out() {
    let app = Router::new().fallback(|uri: Uri| async move {
        if uri.path() == "/describe_index_stats" {
            return stats(3).into_response();
        }
        tokio::time::sleep(Duration::from_secs(5)).await;
        Response::new(axum::body::Body::empty())
    });
    let store = connect(serve(app).await, 1).await.expect("connect");
    let chunk = Chunk { id: "c0".into(), source: "a.txt".into(), text: "Paris".into(), index: 0, start: 0, end: 5, page: None };
    let err = store.upsert(&[IndexedRecord { chunk, vector: vec![1.0, 0.0, 0.0] }]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
}
