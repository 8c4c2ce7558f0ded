//! Ollama backend: models must already be pulled on the local server.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{send_json, GenerationBackend, LlmError, RetryPolicy, TextGenerator};

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Clone)]
pub struct OllamaApi {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl OllamaApi {
    pub fn new(client: Client, base_url: &str, retry: RetryPolicy) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
        }
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.post(format!("{}{path}", self.base_url))
    }
}

pub struct OllamaBackend {
    api: OllamaApi,
}

impl OllamaBackend {
    pub fn new(api: OllamaApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl GenerationBackend for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn acquire(&self, model_id: &str) -> Result<Arc<dyn TextGenerator>, LlmError> {
        // /api/show only succeeds for models present on the server.
        let request = self.api.post("/api/show").json(&json!({ "model": model_id }));
        send_json::<serde_json::Value>(request, self.api.retry)
            .await
            .map_err(|e| LlmError::Unavailable {
                model: model_id.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Arc::new(OllamaGenerator {
            api: self.api.clone(),
            model_id: model_id.to_string(),
        }))
    }
}

pub struct OllamaGenerator {
    api: OllamaApi,
    model_id: String,
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn generate(&self, prompt: &str, max_new_tokens: u32) -> Result<String, LlmError> {
        let request = self.api.post("/api/generate").json(&json!({
            "model": self.model_id,
            "prompt": prompt,
            "stream": false,
            "options": { "num_predict": max_new_tokens },
        }));

        let response: GenerateResponse = send_json(request, self.api.retry).await?;
        if response.response.trim().is_empty() {
            return Err(LlmError::EmptyContent);
        }
        Ok(response.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::build_http_client;
    use httpmock::prelude::*;

    fn api(server: &MockServer) -> OllamaApi {
        OllamaApi::new(
            build_http_client().unwrap(),
            &server.base_url(),
            RetryPolicy::immediate(),
        )
    }

    #[tokio::test]
    async fn test_acquire_present_model() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/show");
                then.status(200).json_body(serde_json::json!({"details": {}}));
            })
            .await;

        let backend = OllamaBackend::new(api(&server));
        let generator = backend.acquire("tinyllama").await.unwrap();
        assert_eq!(generator.model_id(), "tinyllama");
    }

    #[tokio::test]
    async fn test_acquire_missing_model_is_unavailable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/show");
                then.status(404)
                    .body(r#"{"error": "model 'mistral' not found"}"#);
            })
            .await;

        let backend = OllamaBackend::new(api(&server));
        let err = backend.acquire("mistral").await.err().unwrap();
        assert!(matches!(err, LlmError::Unavailable { .. }));
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_generate_returns_response_field() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200)
                    .json_body(serde_json::json!({"response": "Sure! {}", "done": true}));
            })
            .await;

        let generator = OllamaGenerator {
            api: api(&server),
            model_id: "tinyllama".to_string(),
        };
        assert_eq!(generator.generate("p", 64).await.unwrap(), "Sure! {}");
    }
}
