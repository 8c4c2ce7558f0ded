//! Similarity Scorer: cosine similarity between two texts' embeddings.

use std::sync::Arc;

use tracing::debug;

use crate::embeddings::EmbeddingProvider;
use crate::errors::AppError;

#[derive(Clone)]
pub struct SimilarityScorer {
    provider: Arc<dyn EmbeddingProvider>,
    /// Unit-normalize vectors before comparing.
    normalize: bool,
}

impl SimilarityScorer {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, normalize: bool) -> Self {
        Self {
            provider,
            normalize,
        }
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    /// Cosine similarity of the two texts, in `[-1, 1]`. Both texts go out in one batch.
    pub async fn similarity(&self, text_a: &str, text_b: &str) -> Result<f64, AppError> {
        let mut vectors = self
            .provider
            .embed(&[text_a.to_string(), text_b.to_string()])
            .await
            .map_err(|e| AppError::Embedding(e.to_string()))?;

        if vectors.len() != 2 {
            return Err(AppError::Embedding(format!(
                "expected 2 embeddings, got {}",
                vectors.len()
            )));
        }
        let mut b = vectors.pop().unwrap_or_default();
        let mut a = vectors.pop().unwrap_or_default();

        if a.len() != b.len() {
            return Err(AppError::Embedding(format!(
                "embedding dimensions differ: {} vs {}",
                a.len(),
                b.len()
            )));
        }

        if self.normalize {
            normalize(&mut a);
            normalize(&mut b);
        }

        let score = cosine_similarity(&a, &b);
        debug!(
            provider = self.provider.name(),
            model = self.provider.model(),
            dim = a.len(),
            score,
            "Computed similarity"
        );
        Ok(score)
    }
}

/// Scales `v` to unit length in place. Zero vectors are left untouched.
pub fn normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x = (*x as f64 / norm) as f32;
        }
    }
}

/// Cosine similarity, accumulated in f64 and clamped to `[-1, 1]`.
/// Returns 0 when either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0_f64, 0.0_f64, 0.0_f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}
