//! Model Fallback Resolver: strict ordered fallback over candidate model ids.
//!
//! Candidates are tried front to back; the first one that acquires wins and is
//! kept for the life of the process. There is no re-probe of earlier
//! candidates and no health-check loop. Every failed attempt is recorded so the
//! reason a fallback level was reached is visible in logs.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{OnceCell, Semaphore};
use tracing::{debug, info, warn};

use super::{GenerationBackend, LlmError, TextGenerator};

/// One failed acquisition in the fallback chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FallbackAttempt {
    pub model_id: String,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no generation model candidates configured")]
    NoCandidates,

    #[error("all {} generation model candidates failed: {}", .attempts.len(), describe(.attempts))]
    Exhausted { attempts: Vec<FallbackAttempt> },
}

fn describe(attempts: &[FallbackAttempt]) -> String {
    attempts
        .iter()
        .map(|a| format!("{} ({})", a.model_id, a.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Outcome of a successful resolution.
pub struct ResolvedModel {
    pub generator: Arc<dyn TextGenerator>,
    pub model_id: String,
    /// Candidates that failed before `model_id` was selected, in order.
    pub failed_attempts: Vec<FallbackAttempt>,
}

impl std::fmt::Debug for ResolvedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedModel")
            .field("model_id", &self.model_id)
            .field("failed_attempts", &self.failed_attempts)
            .finish()
    }
}

pub struct ModelResolver {
    backend: Arc<dyn GenerationBackend>,
    candidates: Vec<String>,
}

impl ModelResolver {
    pub fn new(backend: Arc<dyn GenerationBackend>, candidates: Vec<String>) -> Self {
        Self {
            backend,
            candidates,
        }
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub async fn resolve(&self) -> Result<ResolvedModel, ResolveError> {
        if self.candidates.is_empty() {
            return Err(ResolveError::NoCandidates);
        }

        let mut failed_attempts = Vec::new();

        for model_id in &self.candidates {
            info!(
                backend = self.backend.name(),
                "Acquiring generation model {model_id}"
            );
            match self.backend.acquire(model_id).await {
                Ok(generator) => {
                    info!(
                        "Generation model resolved: {model_id} (after {} failed candidates)",
                        failed_attempts.len()
                    );
                    return Ok(ResolvedModel {
                        generator,
                        model_id: model_id.clone(),
                        failed_attempts,
                    });
                }
                Err(e) => {
                    warn!("Generation model {model_id} unavailable, falling back: {e}");
                    failed_attempts.push(FallbackAttempt {
                        model_id: model_id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Err(ResolveError::Exhausted {
            attempts: failed_attempts,
        })
    }
}

/// Process-wide generation capability.
///
/// Resolution happens at most once successfully; concurrent callers arriving
/// during an in-flight resolution wait on it instead of starting another.
/// Generation calls are capped by a semaphore and bounded by a timeout.
pub struct ModelHandle {
    resolver: ModelResolver,
    resolved: OnceCell<ResolvedModel>,
    permits: Semaphore,
    timeout: Duration,
    max_new_tokens: u32,
}

impl ModelHandle {
    pub fn new(
        resolver: ModelResolver,
        concurrency: usize,
        timeout: Duration,
        max_new_tokens: u32,
    ) -> Self {
        Self {
            resolver,
            resolved: OnceCell::new(),
            permits: Semaphore::new(concurrency.max(1)),
            timeout,
            max_new_tokens,
        }
    }

    pub async fn get_or_resolve(&self) -> Result<&ResolvedModel, ResolveError> {
        self.resolved
            .get_or_try_init(|| self.resolver.resolve())
            .await
    }

    /// The active model id, if resolution has completed.
    pub fn active_model(&self) -> Option<&str> {
        self.resolved.get().map(|r| r.model_id.as_str())
    }

    /// Runs one generation call on the resolved model.
    pub async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let resolved = self
            .get_or_resolve()
            .await
            .map_err(|e| LlmError::Unavailable {
                model: "<unresolved>".to_string(),
                reason: e.to_string(),
            })?;

        // The timeout covers the wait for a permit as well as the call itself.
        let call = async {
            // A closed semaphore never happens here; treat it like a timeout if it does.
            let _permit = self
                .permits
                .acquire()
                .await
                .map_err(|_| LlmError::Timeout(Duration::ZERO))?;
            debug!(model = resolved.generator.model_id(), "Generating");
            resolved
                .generator
                .generate(prompt, self.max_new_tokens)
                .await
        };

        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| LlmError::Timeout(self.timeout))?
    }
}
