//! Embedding providers behind the [`Embedder`] trait.
use std::sync::Arc;

use tracing::info;

use minirag_core::config::{EmbeddingProviderKind, Settings};
use minirag_core::traits::Embedder;
use minirag_core::Result;

pub mod gemini;
pub mod hashing;

pub use gemini::GeminiEmbedder;
pub use hashing::HashingEmbedder;

/// Build the configured embedder. `APP_USE_FAKE_EMBEDDINGS=1` forces the
/// offline hashing embedder regardless of the configured provider.
pub fn get_default_embedder(settings: &Settings) -> Result<Arc<dyn Embedder>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if use_fake || settings.embedding.provider == EmbeddingProviderKind::Hashing {
        info!(dim = settings.embedding.dimension, "using hashing embedder");
        return Ok(Arc::new(HashingEmbedder::new(settings.embedding.dimension)));
    }
    let embedder = GeminiEmbedder::new(&settings.embedding, &settings.network, &settings.keys)?;
    info!(model = %settings.embedding.model, dim = settings.embedding.dimension, "using Gemini embeddings");
    Ok(Arc::new(embedder))
}
