//! Hugging Face backend: acquisition via Hub metadata, generation via the
//! serverless inference API.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{send_json, GenerationBackend, LlmError, RetryPolicy, TextGenerator};

/// Hub pipeline tags this backend knows how to prompt.
const SUPPORTED_PIPELINES: &[&str] = &["text-generation", "text2text-generation"];

#[derive(Debug, Deserialize)]
struct HubModelInfo {
    #[serde(default)]
    pipeline_tag: Option<String>,
    #[serde(default)]
    disabled: bool,
}

#[derive(Debug, Deserialize)]
struct GeneratedText {
    generated_text: String,
}

/// Shared connection settings for every Hugging Face call.
#[derive(Clone)]
pub struct HuggingFaceApi {
    client: Client,
    inference_url: String,
    hub_url: String,
    token: Option<String>,
    retry: RetryPolicy,
}

impl HuggingFaceApi {
    pub fn new(
        client: Client,
        inference_url: &str,
        hub_url: &str,
        token: Option<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            inference_url: inference_url.trim_end_matches('/').to_string(),
            hub_url: hub_url.trim_end_matches('/').to_string(),
            token,
            retry,
        }
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    pub fn inference_endpoint(&self, model_id: &str) -> String {
        format!("{}/models/{model_id}", self.inference_url)
    }

    fn hub_endpoint(&self, model_id: &str) -> String {
        format!("{}/api/models/{model_id}", self.hub_url)
    }

    pub fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        self.authorize(self.client.post(url))
    }
}

pub struct HuggingFaceBackend {
    api: HuggingFaceApi,
}

impl HuggingFaceBackend {
    pub fn new(api: HuggingFaceApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl GenerationBackend for HuggingFaceBackend {
    fn name(&self) -> &str {
        "huggingface"
    }

    async fn acquire(&self, model_id: &str) -> Result<Arc<dyn TextGenerator>, LlmError> {
        let request = self
            .api
            .authorize(self.api.client.get(self.api.hub_endpoint(model_id)));
        let info: HubModelInfo = send_json(request, self.api.retry).await.map_err(|e| {
            LlmError::Unavailable {
                model: model_id.to_string(),
                reason: e.to_string(),
            }
        })?;

        if info.disabled {
            return Err(LlmError::Unavailable {
                model: model_id.to_string(),
                reason: "model is disabled on the Hub".to_string(),
            });
        }

        match info.pipeline_tag.as_deref() {
            Some(tag) if SUPPORTED_PIPELINES.contains(&tag) => {
                debug!("Hugging Face model {model_id} serves pipeline {tag}");
            }
            other => {
                return Err(LlmError::Unavailable {
                    model: model_id.to_string(),
                    reason: format!(
                        "incompatible pipeline {:?} (expected one of {:?})",
                        other.unwrap_or("none"),
                        SUPPORTED_PIPELINES
                    ),
                });
            }
        }

        Ok(Arc::new(HuggingFaceGenerator {
            api: self.api.clone(),
            model_id: model_id.to_string(),
        }))
    }
}

fn generation_body(prompt: &str, max_new_tokens: u32) -> serde_json::Value {
    json!({
        "inputs": prompt,
        "parameters": {
            "max_new_tokens": max_new_tokens,
            "return_full_text": false,
        },
    })
}

pub struct HuggingFaceGenerator {
    api: HuggingFaceApi,
    model_id: String,
}

#[async_trait]
impl TextGenerator for HuggingFaceGenerator {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn generate(&self, prompt: &str, max_new_tokens: u32) -> Result<String, LlmError> {
        let request = self
            .api
            .post(&self.api.inference_endpoint(&self.model_id))
            .json(&generation_body(prompt, max_new_tokens));

        let outputs: Vec<GeneratedText> = send_json(request, self.api.retry).await?;

        outputs
            .into_iter()
            .next()
            .map(|o| o.generated_text)
            .filter(|text| !text.trim().is_empty())
            .ok_or(LlmError::EmptyContent)
    }
}
