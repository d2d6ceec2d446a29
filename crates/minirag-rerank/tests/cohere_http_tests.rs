use std::time::Duration;

use axum::http::StatusCode;
use axum::{Json, Router};
use serde_json::{json, Value};

use minirag_core::config::{ApiKeys, NetworkSettings, RerankSettings};
use minirag_core::traits::Reranker;
use minirag_core::types::{Chunk, RetrievedCandidate};
use minirag_core::ErrorKind;
use minirag_rerank::CohereReranker;

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

fn reranker(base_url: String, timeout_secs: u64) -> CohereReranker {
    let settings = RerankSettings { base_url, ..Default::default() };
    let network = NetworkSettings { timeout_secs, connect_timeout_secs: 1 };
    let keys = ApiKeys { cohere_api_key: Some("test-key".into()), ..Default::default() };
    CohereReranker::new(&settings, &network, &keys).expect("reranker")
}

fn candidates() -> Vec<RetrievedCandidate> {
    ["Bananas are yellow.", "Paris is the capital of France.", "Rivers flow."]
        .iter()
        .enumerate()
        .map(|(i, text)| RetrievedCandidate {
            chunk: Chunk { id: format!("c{i}"), source: "doc.txt".into(), text: text.to_string(), index: i, start: 0, end: text.len(), page: None },
            score: 0.5,
        })
        .collect()
}

#[tokio::test]
async fn results_reorder_candidates() {
    let app = Router::new().fallback(|| async {
        Json(json!({"id": "r1", "results": [{"index": 1, "relevance_score": 0.98}, {"index": 2, "relevance_score": 0.12}]}))
    });
    let r = reranker(serve(app).await, 5);
    let out = r.rerank("capital of France", candidates(), 2).await.expect("rerank");
    let ids: Vec<&str> = out.iter().map(|c| c.chunk().id.as_str()).collect();
    assert_eq!(ids, vec!["c1", "c2"]);
    assert_eq!(out[0].candidate, candidates()[1]);
}

#[tokio::test]
async fn unauthorized_is_a_rerank_error() {
    let app = Router::new().fallback(|| async { (StatusCode::UNAUTHORIZED, Json(json!({"message": "invalid api token"}))) });
    let r = reranker(serve(app).await, 5);
    let err = r.rerank("capital", candidates(), 3).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Rerank);
    assert!(err.to_string().contains("401"));
}

#[tokio::test]
async fn out_of_range_index_is_a_rerank_error() {
    let app = Router::new().fallback(|| async { Json(json!({"results": [{"index": 7, "relevance_score": 0.5}]})) });
    let r = reranker(serve(app).await, 5);
    assert_eq!(r.rerank("capital", candidates(), 3).await.unwrap_err().kind(), ErrorKind::Rerank);
}

#[tokio::test]
async fn slow_service_times_out() {
    let app = Router::new().fallback(|| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Json(Value::Null)
    });
    let r = reranker(serve(app).await, 1);
    assert_eq!(r.rerank("capital", candidates(), 3).await.unwrap_err().kind(), ErrorKind::Timeout);
}
