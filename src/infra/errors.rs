// src/infra/errors.rs — Error types for Promptune

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PromptuneError {
    // Backend errors (retriable)
    #[error("Provider '{provider}' error: {message}")]
    Provider {
        provider: String,
        message: String,
        retriable: bool,
    },

    #[error("Rate limited by '{provider}', retry after {retry_after_ms}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: u64,
    },

    // A broken evaluator invalidates the whole run. Surfaced to the
    // entry-point caller, never absorbed by the search loops.
    #[error("Evaluator failed on instruction '{instruction}': {message}")]
    Evaluator {
        instruction: String,
        message: String,
    },

    #[error("No provider configured. Set OPENAI_API_KEY, PROMPTUNE_BASE_URL, or run a local Ollama.")]
    NoProvider,

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PromptuneError {
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            PromptuneError::Provider {
                retriable: true,
                ..
            } | PromptuneError::RateLimited { .. }
        )
    }
}
