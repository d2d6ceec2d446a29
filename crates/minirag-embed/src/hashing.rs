use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use twox_hash::XxHash64;

use minirag_core::traits::Embedder;
use minirag_core::Result;

/// Offline embedder: hashed bag of lowercase words, L2-normalized.
///
/// Texts sharing words land near each other, which is enough for local runs
/// and tests without a network connection.
pub struct HashingEmbedder {
    dim: usize,
    model_id: String,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim: dim.max(1), model_id: format!("hashing:xxh64-{dim}") } }

    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        let tokens = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase);
        for (i, token) in tokens.enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += 0.5 + val + (i as f32 % 3.0) * 0.01;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 1e-6 {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn model_id(&self) -> &str { &self.model_id }

    fn dim(&self) -> usize { self.dim }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> { Ok(self.embed_sync(text)) }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_sync(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() }

    #[test]
    fn case_and_punctuation_do_not_matter() {
        let e = HashingEmbedder::new(64);
        let a = e.embed_sync("Paris, France!");
        let b = e.embed_sync("paris france");
        assert!((cosine(&a, &b) - 1.0).abs() < 1e-3);
    }

    #[test]
    fn shared_words_score_higher() {
        let e = HashingEmbedder::new(256);
        let q = e.embed_sync("capital of France");
        let near = e.embed_sync("Paris is the capital of France.");
        let far = e.embed_sync("Bananas grow in tropical climates.");
        assert!(cosine(&q, &near) > cosine(&q, &far));
    }

    #[test]
    fn empty_text_is_the_zero_vector() {
        let e = HashingEmbedder::new(8);
        assert!(e.embed_sync("  ").iter().all(|x| *x == 0.0));
    }
}
