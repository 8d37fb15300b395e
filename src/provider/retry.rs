// src/provider/retry.rs — Retry with exponential backoff for model providers
//
// Wraps any ModelProvider with automatic retry on transient failures.
// Retries: rate limits (429), server errors (5xx), timeouts, connection resets.
// Does NOT retry: bad request (400), auth errors (401, 403).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{ChatRequest, ChatResponse, ModelProvider};
use crate::infra::errors::PromptuneError;

/// Default retry configuration.
const MAX_RETRIES: u32 = 5;
const INITIAL_DELAY_MS: u64 = 1_000;
const BACKOFF_FACTOR: f64 = 2.0;
const MAX_DELAY_MS: u64 = 20_000;
const JITTER_FRACTION: f64 = 0.2;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
    pub jitter_fraction: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            initial_delay: Duration::from_millis(INITIAL_DELAY_MS),
            backoff_factor: BACKOFF_FACTOR,
            max_delay: Duration::from_millis(MAX_DELAY_MS),
            jitter_fraction: JITTER_FRACTION,
        }
    }
}

/// A provider wrapper that adds retry with exponential backoff.
pub struct RetryProvider {
    inner: Arc<dyn ModelProvider>,
    config: RetryConfig,
}

impl RetryProvider {
    pub fn new(inner: Arc<dyn ModelProvider>) -> Self {
        Self {
            inner,
            config: RetryConfig::default(),
        }
    }

    pub fn with_config(inner: Arc<dyn ModelProvider>, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    /// Calculate the delay for a given retry attempt (0-indexed).
    fn delay_for_attempt(&self, attempt: u32, rate_limit_delay: Option<Duration>) -> Duration {
        // If the server told us how long to wait, use that (with a small buffer).
        if let Some(rl_delay) = rate_limit_delay {
            return rl_delay + Duration::from_millis(100);
        }

        let base_ms = self.config.initial_delay.as_millis() as f64
            * self.config.backoff_factor.powi(attempt as i32);
        let capped_ms = base_ms.min(self.config.max_delay.as_millis() as f64);

        let jitter = deterministic_jitter(attempt, self.config.jitter_fraction);
        let final_ms = (capped_ms * jitter).max(100.0);

        Duration::from_millis(final_ms as u64)
    }
}

fn should_retry(error: &PromptuneError) -> bool {
    error.is_retriable()
}

/// Extract rate-limit retry delay from the error, if available.
fn rate_limit_delay(error: &PromptuneError) -> Option<Duration> {
    match error {
        PromptuneError::RateLimited { retry_after_ms, .. } if *retry_after_ms > 0 => {
            Some(Duration::from_millis(*retry_after_ms))
        }
        _ => None,
    }
}

/// Deterministic jitter for a given attempt to keep retries reproducible in tests.
/// Returns a multiplier in [1 - fraction, 1 + fraction].
fn deterministic_jitter(attempt: u32, fraction: f64) -> f64 {
    let hash = (attempt.wrapping_mul(2654435761)) as f64 / u32::MAX as f64; // 0.0..1.0
    1.0 + fraction * (2.0 * hash - 1.0)
}

#[async_trait]
impl ModelProvider for RetryProvider {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, PromptuneError> {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match self.inner.chat(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if !should_retry(&e) || attempt == self.config.max_retries {
                        return Err(e);
                    }

                    let rl_delay = rate_limit_delay(&e);
                    let delay = self.delay_for_attempt(attempt, rl_delay);

                    tracing::warn!(
                        provider = self.inner.id(),
                        attempt = attempt + 1,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying after error: {}",
                        e
                    );

                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(PromptuneError::Provider {
            provider: self.inner.id().to_string(),
            message: "All retries exhausted".into(),
            retriable: false,
        }))
    }
}
