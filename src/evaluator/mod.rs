// src/evaluator/mod.rs — Instruction evaluation against examples

use std::sync::Arc;

use async_trait::async_trait;

use crate::dataset::Example;
use crate::infra::errors::PromptuneError;
use crate::provider::{ChatRequest, Message, ModelProvider};

/// One evaluation's outcome: a score in [0, 1] and the token cost incurred.
#[derive(Debug, Clone, Copy)]
pub struct Scored {
    pub score: f64,
    pub cost: u64,
}

/// Scores an instruction on a single example. Failures propagate: a
/// systematically broken evaluator invalidates the run, so the search loops
/// never absorb these errors.
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(&self, instruction: &str, example: &Example)
        -> Result<Scored, PromptuneError>;
}

/// Runs the downstream model with the candidate instruction as the system
/// prompt and scores the reply against the gold target by normalized exact
/// match.
pub struct ModelEvaluator {
    provider: Arc<dyn ModelProvider>,
    model: String,
}

impl ModelEvaluator {
    pub fn new(provider: Arc<dyn ModelProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Evaluator for ModelEvaluator {
    async fn evaluate(
        &self,
        instruction: &str,
        example: &Example,
    ) -> Result<Scored, PromptuneError> {
        let response = self
            .provider
            .chat(ChatRequest {
                model: self.model.clone(),
                messages: vec![Message::user(example.input.clone())],
                max_tokens: Some(50),
                temperature: Some(0.0),
                system: Some(instruction.to_string()),
            })
            .await
            .map_err(|e| PromptuneError::Evaluator {
                instruction: crate::util::truncate_str(instruction, 60).to_string(),
                message: e.to_string(),
            })?;

        let score = if answers_match(&response.content, &example.target) {
            1.0
        } else {
            0.0
        };

        Ok(Scored {
            score,
            cost: response.usage.total() as u64,
        })
    }
}

/// Normalized answer comparison: case-insensitive, punctuation-tolerant,
/// and accepting the gold label anywhere in a short reply (models rarely
/// emit the bare label even when told to).
fn answers_match(reply: &str, target: &str) -> bool {
    let reply_norm = normalize(reply);
    let target_norm = normalize(target);
    if target_norm.is_empty() {
        return reply_norm.is_empty();
    }
    if reply_norm == target_norm {
        return true;
    }
    reply_norm.split_whitespace().any(|tok| tok == target_norm)
}

fn normalize(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect()
}
