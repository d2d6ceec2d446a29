use minirag_core::config::{EmbeddingProviderKind, Settings};
use minirag_embed::get_default_embedder;

#[tokio::test]
async fn fake_embedder_shapes_and_determinism() {
    // Force fake embedder to avoid network calls
    std::env::set_var("APP_USE_FAKE_EMBEDDINGS", "1");

    let embedder = get_default_embedder(&Settings::default()).expect("embedder");
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).await.expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), 768, "embedding dim follows settings");
    assert_eq!(embedder.dim(), 768);

    // Norm approximately 1.0
    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    // Deterministic for same input
    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }

    let q = embedder.embed("hello world").await.expect("embed");
    assert_eq!(&q, v1, "queries and documents share one space");
}

#[tokio::test]
async fn hashing_provider_is_selectable_from_settings() {
    let mut settings = Settings::default();
    settings.embedding.provider = EmbeddingProviderKind::Hashing;
    settings.embedding.dimension = 32;
    let embedder = get_default_embedder(&settings).expect("embedder");
    assert_eq!(embedder.dim(), 32);
    assert!(embedder.model_id().starts_with("hashing:"));
}
