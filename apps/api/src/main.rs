mod config;
mod embeddings;
mod errors;
mod extraction;
mod llm_client;
mod routes;
mod scoring;
mod skills;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, ModelBackend, ScoringVariant};
use crate::embeddings::{
    EmbeddingProvider, HuggingFaceEmbeddings, OllamaEmbeddings, SimilarityScorer,
};
use crate::extraction::TextExtractor;
use crate::llm_client::huggingface::{HuggingFaceApi, HuggingFaceBackend};
use crate::llm_client::ollama::{OllamaApi, OllamaBackend};
use crate::llm_client::{build_http_client, GenerationBackend, ModelHandle, ModelResolver, RetryPolicy};
use crate::routes::build_router;
use crate::scoring::pipeline::{ScoringPipeline, SkillStrategy};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ATS API v{}", env!("CARGO_PKG_VERSION"));

    let http = build_http_client().context("Failed to build HTTP client")?;
    let hf = HuggingFaceApi::new(
        http.clone(),
        &config.hf_inference_url,
        &config.hf_hub_url,
        config.hf_token.clone(),
        RetryPolicy::default(),
    );
    let ollama = OllamaApi::new(http, &config.ollama_url, RetryPolicy::default());

    // Embedding provider
    let embedder: Arc<dyn EmbeddingProvider> = match config.embedding_backend {
        ModelBackend::HuggingFace => Arc::new(HuggingFaceEmbeddings::new(
            hf.clone(),
            config.embedding_model.clone(),
        )),
        ModelBackend::Ollama => Arc::new(OllamaEmbeddings::new(
            ollama.clone(),
            config.embedding_model.clone(),
        )),
    };
    let similarity = SimilarityScorer::new(embedder, config.normalize_embeddings);
    info!(
        "Embedding model: {} (normalize: {})",
        similarity.model(),
        config.normalize_embeddings
    );

    // Skill strategy. The model variant resolves its fallback chain before serving.
    let strategy = match config.variant {
        ScoringVariant::Keyword => SkillStrategy::Keyword,
        ScoringVariant::Model => {
            let backend: Arc<dyn GenerationBackend> = match config.generation_backend {
                ModelBackend::HuggingFace => Arc::new(HuggingFaceBackend::new(hf)),
                ModelBackend::Ollama => Arc::new(OllamaBackend::new(ollama)),
            };
            let handle = build_model_handle(&config, backend).await?;
            SkillStrategy::Model(Arc::new(handle))
        }
    };
    info!("Scoring variant: {:?}", config.variant);

    let pipeline = ScoringPipeline::new(TextExtractor::pdf(), similarity, strategy);

    // Build app state
    let state = AppState {
        pipeline: Arc::new(pipeline),
        max_upload_bytes: config.max_upload_bytes,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Resolves the generation fallback chain once. Startup fails if no candidate loads.
async fn build_model_handle(
    config: &Config,
    backend: Arc<dyn GenerationBackend>,
) -> Result<ModelHandle> {
    let resolver = ModelResolver::new(backend, config.generation_models.clone());
    info!(
        "Generation fallback chain: {}",
        resolver.candidates().join(" -> ")
    );

    let handle = ModelHandle::new(
        resolver,
        config.generation_concurrency,
        Duration::from_secs(config.generation_timeout_secs),
        config.max_new_tokens,
    );

    let resolved = handle
        .get_or_resolve()
        .await
        .context("No generation model could be loaded")?;
    for attempt in &resolved.failed_attempts {
        warn!(
            "Skipped generation model {}: {}",
            attempt.model_id, attempt.reason
        );
    }
    info!(
        "Generation model active: {}",
        handle.active_model().unwrap_or("<none>")
    );

    Ok(handle)
}
