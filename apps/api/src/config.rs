use std::str::FromStr;

use anyhow::{bail, Context, Result};

/// Default fallback chain: largest first, the last one small enough to always load.
pub const DEFAULT_GENERATION_MODELS: &str =
    "mistralai/Mistral-7B-Instruct-v0.2,google/flan-t5-base,TinyLlama/TinyLlama-1.1B-Chat-v1.0";
pub const DEFAULT_EMBEDDING_MODEL: &str = "BAAI/bge-large-en-v1.5";

/// Which skill strategy (and its paired fusion policy) the service runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringVariant {
    /// Keyword skills + weighted fusion.
    Keyword,
    /// Model-generated skills + similarity-only fusion.
    Model,
}

impl FromStr for ScoringVariant {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keyword" => Ok(Self::Keyword),
            "model" => Ok(Self::Model),
            other => bail!("unknown scoring variant '{other}' (expected 'keyword' or 'model')"),
        }
    }
}

/// Where embedding and generation calls are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelBackend {
    HuggingFace,
    Ollama,
}

impl FromStr for ModelBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            "ollama" => Ok(Self::Ollama),
            other => bail!("unknown model backend '{other}' (expected 'huggingface' or 'ollama')"),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Startup aborts if a variable is present but malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub variant: ScoringVariant,
    pub embedding_backend: ModelBackend,
    pub embedding_model: String,
    pub normalize_embeddings: bool,
    pub generation_backend: ModelBackend,
    /// Ordered fallback chain, tried front to back.
    pub generation_models: Vec<String>,
    pub max_new_tokens: u32,
    pub generation_timeout_secs: u64,
    pub generation_concurrency: usize,
    pub hf_token: Option<String>,
    pub hf_inference_url: String,
    pub hf_hub_url: String,
    pub ollama_url: String,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let generation_models = parse_model_list(&env_or(
            "GENERATION_MODELS",
            DEFAULT_GENERATION_MODELS,
        ))?;

        Ok(Config {
            port: parse_env("PORT", 8080)?,
            rust_log: env_or("RUST_LOG", "info"),
            variant: parse_env("SCORING_VARIANT", ScoringVariant::Keyword)?,
            embedding_backend: parse_env("EMBEDDING_BACKEND", ModelBackend::HuggingFace)?,
            embedding_model: env_or("EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL),
            normalize_embeddings: parse_env("NORMALIZE_EMBEDDINGS", true)?,
            generation_backend: parse_env("GENERATION_BACKEND", ModelBackend::HuggingFace)?,
            generation_models,
            max_new_tokens: parse_env("MAX_NEW_TOKENS", 512)?,
            generation_timeout_secs: parse_env("GENERATION_TIMEOUT_SECS", 60)?,
            generation_concurrency: parse_env::<usize>("GENERATION_CONCURRENCY", 4)?.max(1),
            hf_token: std::env::var("HF_TOKEN").ok().filter(|t| !t.trim().is_empty()),
            hf_inference_url: env_or(
                "HF_INFERENCE_URL",
                "https://router.huggingface.co/hf-inference",
            ),
            hf_hub_url: env_or("HF_HUB_URL", "https://huggingface.co"),
            ollama_url: env_or("OLLAMA_URL", "http://localhost:11434"),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

/// Splits a comma-separated model list, dropping blanks. An empty chain is an error.
pub fn parse_model_list(raw: &str) -> Result<Vec<String>> {
    let models: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(String::from)
        .collect();

    if models.is_empty() {
        bail!("GENERATION_MODELS must name at least one model");
    }
    Ok(models)
}
