//! Sentence-embedding providers.
//!
//! Inputs longer than the model's context are truncated by the provider
//! itself; no chunking happens on this side, so the tail of a very long
//! résumé does not influence the score.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::llm_client::huggingface::HuggingFaceApi;
use crate::llm_client::ollama::OllamaApi;
use crate::llm_client::{send_json, LlmError};

pub mod similarity;

pub use similarity::SimilarityScorer;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    /// One vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError>;
}

fn check_count(vectors: &[Vec<f32>], expected: usize) -> Result<(), LlmError> {
    if vectors.len() != expected {
        return Err(LlmError::Api {
            status: 200,
            message: format!(
                "expected {expected} embeddings, provider returned {}",
                vectors.len()
            ),
        });
    }
    Ok(())
}

/// Hugging Face feature-extraction pipeline (sentence-transformers models).
pub struct HuggingFaceEmbeddings {
    api: HuggingFaceApi,
    model: String,
}

impl HuggingFaceEmbeddings {
    pub fn new(api: HuggingFaceApi, model: impl Into<String>) -> Self {
        Self {
            api,
            model: model.into(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HuggingFaceEmbeddings {
    fn name(&self) -> &str {
        "huggingface"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        let url = format!(
            "{}/pipeline/feature-extraction",
            self.api.inference_endpoint(&self.model)
        );
        let request = self.api.post(&url).json(&json!({ "inputs": texts }));
        let vectors: Vec<Vec<f32>> = send_json(request, self.api.retry()).await?;
        check_count(&vectors, texts.len())?;
        Ok(vectors)
    }
}

#[derive(Debug, Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

pub struct OllamaEmbeddings {
    api: OllamaApi,
    model: String,
}

impl OllamaEmbeddings {
    pub fn new(api: OllamaApi, model: impl Into<String>) -> Self {
        Self {
            api,
            model: model.into(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddings {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        let request = self
            .api
            .post("/api/embed")
            .json(&json!({ "model": self.model, "input": texts }));
        let response: OllamaEmbedResponse = send_json(request, self.api.retry()).await?;
        check_count(&response.embeddings, texts.len())?;
        Ok(response.embeddings)
    }
}

/// Deterministic bag-of-words embedder for tests: each lowercase token is
/// hashed into one of 64 buckets.
#[cfg(test)]
pub struct HashingEmbedder;

#[cfg(test)]
#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing"
    }

    fn model(&self) -> &str {
        "hashing-64"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        use std::hash::{Hash, Hasher};

        Ok(texts
            .iter()
            .map(|text| {
                let mut vector = vec![0.0_f32; 64];
                for token in text.split_whitespace() {
                    let mut hasher = std::collections::hash_map::DefaultHasher::new();
                    token.to_lowercase().hash(&mut hasher);
                    vector[(hasher.finish() % 64) as usize] += 1.0;
                }
                vector
            })
            .collect())
    }
}
