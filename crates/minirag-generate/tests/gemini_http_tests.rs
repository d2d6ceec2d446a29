use std::time::Duration;

use axum::http::StatusCode;
use axum::{Json, Router};
use serde_json::{json, Value};

use minirag_core::config::{ApiKeys, GenerationSettings, NetworkSettings};
use minirag_core::traits::LanguageModel;
use minirag_core::ErrorKind;
use minirag_generate::GeminiModel;

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

fn model(base_url: String, timeout_secs: u64) -> GeminiModel {
    let settings = GenerationSettings { base_url, ..Default::default() };
    let network = NetworkSettings { timeout_secs, connect_timeout_secs: 1 };
    let keys = ApiKeys { google_api_key: Some("test-key".into()), ..Default::default() };
    GeminiModel::new(&settings, &network, &keys).expect("model")
}

#[tokio::test]
async fn completion_text_is_returned() {
    let app = Router::new().fallback(|| async {
        Json(json!({"candidates": [{"content": {"role": "model", "parts": [{"text": "Paris [Source ID: 1]"}]}, "finishReason": "STOP"}]}))
    });
    let m = model(serve(app).await, 5);
    assert_eq!(m.generate("prompt").await.expect("generate"), "Paris [Source ID: 1]");
}

#[tokio::test]
async fn unauthorized_is_a_generation_error() {
    let app = Router::new().fallback(|| async {
        (StatusCode::UNAUTHORIZED, Json(json!({"error": {"code": 401, "status": "UNAUTHENTICATED"}})))
    });
    let m = model(serve(app).await, 5);
    let err = m.generate("prompt").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Generation);
    assert!(err.to_string().contains("401"));
}

#[tokio::test]
async fn blocked_prompt_is_a_generation_error() {
    let app = Router::new().fallback(|| async { Json(json!({"promptFeedback": {"blockReason": "SAFETY"}})) });
    let m = model(serve(app).await, 5);
    let err = m.generate("prompt").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Generation);
    assert!(err.to_string().contains("SAFETY"));
}

#[tokio::test]
async fn slow_service_times_out() {
    let app = Router::new().fallback(|| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Json(Value::Null)
    });
    let m = model(serve(app).await, 1);
    assert_eq!(m.generate("prompt").await.unwrap_err().kind(), ErrorKind::Timeout);
}
