//! LLM Client: the single point of entry for every generative model call.
//!
//! ARCHITECTURAL RULE: No other module talks to a generation endpoint directly.
//! Skill extraction reaches the model only through `ModelHandle`, which owns the
//! fallback chain, the concurrency cap and the per-call timeout.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

pub mod huggingface;
pub mod ollama;
pub mod resolver;

pub use resolver::{ModelHandle, ModelResolver};

const HTTP_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Gave up after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    #[error("Model returned empty content")]
    EmptyContent,

    #[error("Model '{model}' is unavailable: {reason}")]
    Unavailable { model: String, reason: String },

    #[error("Generation timed out after {0:?}")]
    Timeout(Duration),
}

/// Retry policy shared by every model HTTP call.
/// Transport errors, 429 and 5xx are retried with exponential backoff.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    #[cfg(test)]
    pub fn immediate() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::ZERO,
        }
    }
}

/// A generative capability bound to one model. Safe to share across requests.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn model_id(&self) -> &str;

    /// Returns the raw completion text, without the prompt.
    async fn generate(&self, prompt: &str, max_new_tokens: u32) -> Result<String, LlmError>;
}

/// Something that can turn a model identifier into a `TextGenerator`.
///
/// `acquire` fails when the model is missing, unreachable or served by an
/// incompatible runtime; the resolver then moves on to the next candidate.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn acquire(&self, model_id: &str) -> Result<Arc<dyn TextGenerator>, LlmError>;
}

pub fn build_http_client() -> Result<Client, LlmError> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()?)
}

/// Sends `request`, retrying per `policy`, and deserializes a 2xx JSON body.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
    policy: RetryPolicy,
) -> Result<T, LlmError> {
    let mut last_error: Option<LlmError> = None;

    for attempt in 0..policy.max_attempts {
        if attempt > 0 {
            // Exponential backoff: base, 2*base, 4*base...
            let delay = policy.base_delay * (1 << (attempt - 1));
            warn!(
                "Model call attempt {} failed, retrying after {}ms...",
                attempt,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }

        let Some(request) = request.try_clone() else {
            return Err(LlmError::Api {
                status: 0,
                message: "request body cannot be replayed".to_string(),
            });
        };

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                last_error = Some(LlmError::Http(e));
                continue;
            }
        };

        let status = response.status();

        if status.as_u16() == 429 || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            warn!("Model API returned {}: {}", status, body);
            last_error = Some(LlmError::Api {
                status: status.as_u16(),
                message: body,
            });
            continue;
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: extract_error_message(&body),
            });
        }

        let bytes = response.bytes().await?;
        debug!("Model call succeeded: {} bytes", bytes.len());
        return Ok(serde_json::from_slice(&bytes)?);
    }

    Err(last_error.unwrap_or(LlmError::RetriesExhausted {
        attempts: policy.max_attempts,
    }))
}

/// Pulls `{"error": "..."}` out of an error body when present; otherwise returns the body.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| match v.get("error") {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(serde_json::Value::Object(o)) => o
                .get("message")
                .and_then(|m| m.as_str())
                .map(String::from),
            _ => None,
        })
        .unwrap_or_else(|| body.to_string())
}


#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::{json, Value};

    #[test]
    fn test_extract_error_message_string() {
        assert_eq!(
            extract_error_message(r#"{"error": "Model is loading"}"#),
            "Model is loading"
        );
    }

    #[test]
    fn test_extract_error_message_object() {
        assert_eq!(
            extract_error_message(r#"{"error": {"message": "bad key"}}"#),
            "bad key"
        );
    }

    #[test]
    fn test_extract_error_message_plain_body() {
        assert_eq!(extract_error_message("nope"), "nope");
    }

    #[tokio::test]
    async fn test_send_json_retries_server_errors_then_gives_up() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/flaky");
                then.status(503).body(r#"{"error": "Model is loading"}"#);
            })
            .await;

        let client = build_http_client().unwrap();
        let err = send_json::<Value>(
            client.post(server.url("/flaky")).json(&json!({})),
            RetryPolicy::immediate(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, LlmError::Api { status: 503, .. }));
        mock.assert_hits_async(3).await;
    }

    #[tokio::test]
    async fn test_send_json_client_error_is_not_retried() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/bad");
                then.status(400).body(r#"{"error": "bad input"}"#);
            })
            .await;

        let client = build_http_client().unwrap();
        let err = send_json::<Value>(
            client.post(server.url("/bad")).json(&json!({})),
            RetryPolicy::immediate(),
        )
        .await
        .unwrap_err();

        match err {
            LlmError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "bad input");
            }
            other => panic!("unexpected error: {other}"),
        }
        mock.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn test_send_json_decodes_success_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/ok");
                then.status(200).json_body(json!({"value": 42}));
            })
            .await;

        let client = build_http_client().unwrap();
        let body: Value = send_json(client.get(server.url("/ok")), RetryPolicy::immediate())
            .await
            .unwrap();
        assert_eq!(body["value"], 42);
    }
}
