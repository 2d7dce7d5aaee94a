//! Feature-hashing embedder
//!
//! Hashes lowercased word unigrams and bigrams into a fixed number of
//! buckets (FNV-1a) and L2-normalises the counts. Deterministic and offline;
//! texts that share vocabulary land close together under cosine similarity.

use async_trait::async_trait;
use fleet_application::ports::memory::{Embedder, EmbeddingError};

pub const DEFAULT_DIMENSIONS: usize = 256;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

pub struct HashingEmbedder {
    dimensions: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn bucket(&self, feature: &str) -> usize {
        (fnv1a(feature.as_bytes()) % self.dimensions as u64) as usize
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let words: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 1)
            .map(str::to_lowercase)
            .collect();

        let mut vector = vec![0.0_f32; self.dimensions];
        for word in &words {
            vector[self.bucket(word)] += 1.0;
        }
        // bigrams weigh half as much as single words
        for pair in words.windows(2) {
            vector[self.bucket(&format!("{} {}", pair[0], pair[1]))] += 0.5;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::Failed("empty text".to_string()));
        }
        Ok(self.embed_text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_domain::memory::cosine_similarity;

    #[test]
    fn test_same_text_same_vector() {
        let embedder = HashingEmbedder::default();
        let a = embedder.embed_text("RSI oversold bounce on BTC");
        let b = embedder.embed_text("rsi OVERSOLD bounce on btc");
        assert_eq!(a, b);
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_shared_vocabulary_scores_higher() {
        let embedder = HashingEmbedder::default();
        let base = embedder.embed_text("cut losers early when funding flips negative");
        let close = embedder.embed_text("cut losers early when funding turns negative");
        let far = embedder.embed_text("whale inflows preceded the breakout");

        assert!(cosine_similarity(&base, &close) > cosine_similarity(&base, &far));
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected() {
        let embedder = HashingEmbedder::new(32);
        assert_eq!(embedder.dimensions(), 32);
        assert!(embedder.embed("   ").await.is_err());
    }
}
