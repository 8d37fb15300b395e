// src/provider/resolver.rs — Provider discovery from the environment

use std::sync::Arc;
use std::time::Duration;

use super::ollama::OllamaProvider;
use super::openai_compat::OpenAICompatProvider;
use super::retry::{RetryConfig, RetryProvider};
use super::ModelProvider;
use crate::infra::config::RetrySettings;
use crate::infra::errors::PromptuneError;

/// Resolve a model backend, wrapped in retry, from environment variables.
///
/// Order of preference:
/// 1. `PROMPTUNE_BASE_URL` (+ optional `PROMPTUNE_API_KEY`): any
///    OpenAI-compatible gateway.
/// 2. `OPENAI_API_KEY`: api.openai.com.
/// 3. A local Ollama daemon, if reachable.
///
/// Returns the provider and a default model id for it.
pub async fn resolve(
    retry: &RetrySettings,
) -> Result<(Arc<dyn ModelProvider>, String), PromptuneError> {
    let retry_config = RetryConfig {
        max_retries: retry.max_retries,
        initial_delay: Duration::from_millis(retry.initial_delay_ms),
        backoff_factor: retry.backoff_factor,
        max_delay: Duration::from_millis(retry.max_delay_ms),
        jitter_fraction: retry.jitter_fraction,
    };
    if let Ok(base_url) = std::env::var("PROMPTUNE_BASE_URL") {
        let api_key = std::env::var("PROMPTUNE_API_KEY").unwrap_or_default();
        let model = std::env::var("PROMPTUNE_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
        tracing::info!("Provider: custom gateway at {}", base_url);
        let provider = OpenAICompatProvider::new("custom", "Custom Gateway", api_key, base_url);
        return Ok((Arc::new(RetryProvider::with_config(Arc::new(provider), retry_config.clone())), model));
    }

    if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
        let model = std::env::var("PROMPTUNE_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
        tracing::info!("Provider: OpenAI");
        let provider = OpenAICompatProvider::new(
            "openai",
            "OpenAI",
            api_key,
            "https://api.openai.com/v1".into(),
        );
        return Ok((Arc::new(RetryProvider::with_config(Arc::new(provider), retry_config.clone())), model));
    }

    let ollama = OllamaProvider::default();
    if let Ok(models) = ollama.probe().await {
        if !models.is_empty() {
            let model = std::env::var("PROMPTUNE_MODEL")
                .unwrap_or_else(|_| OllamaProvider::pick_best_model(&models));
            tracing::info!("Provider: Ollama ({} local model(s))", models.len());
            return Ok((Arc::new(RetryProvider::with_config(Arc::new(ollama), retry_config)), model));
        }
    }

    Err(PromptuneError::NoProvider)
}
