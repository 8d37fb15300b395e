// src/core/mutate.rs — Guided instruction rewriting

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::meter::TokenMeter;
use super::types::Instruction;
use crate::infra::errors::PromptuneError;
use crate::provider::{ChatRequest, Message, ModelProvider};
use crate::util::truncate_str;

/// Guidance used when the caller wants a plain paraphrase rather than a
/// directed style change.
pub const PARAPHRASE_GUIDANCE: &str =
    "Rephrase the instruction in different words without changing its meaning.";

/// The text-generation collaborator behind every mutation. May fail or
/// return unusable text; the `MutatorSet` absorbs both cases.
#[async_trait]
pub trait RewriteBackend: Send + Sync {
    async fn rewrite(&self, parent: &str, guidance: &str) -> Result<Rewrite, PromptuneError>;
}

/// A rewrite attempt's outcome: the candidate text (possibly empty when the
/// response was unusable) and the token cost actually incurred.
#[derive(Debug, Clone)]
pub struct Rewrite {
    pub text: String,
    pub cost: u64,
}

/// A named mutation style. The registry is data, not code: new mutators are
/// added by adding `(name, guidance)` pairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutatorSpec {
    pub name: String,
    pub guidance: String,
}

impl MutatorSpec {
    pub fn new(name: impl Into<String>, guidance: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            guidance: guidance.into(),
        }
    }

    /// The built-in mutation registry.
    pub fn default_set() -> Vec<MutatorSpec> {
        vec![
            MutatorSpec::new("paraphrase", PARAPHRASE_GUIDANCE),
            MutatorSpec::new(
                "concise",
                "Make the instruction more concise while keeping every requirement.",
            ),
            MutatorSpec::new(
                "detailed",
                "Expand the instruction with clarifying detail about how to solve the task.",
            ),
            MutatorSpec::new(
                "step_by_step",
                "Rewrite the instruction to ask for careful step-by-step reasoning before answering.",
            ),
            MutatorSpec::new(
                "edge_cases",
                "Rewrite the instruction to explicitly handle ambiguous or tricky inputs.",
            ),
            MutatorSpec::new(
                "formal",
                "Rewrite the instruction in precise, formal language.",
            ),
        ]
    }
}

/// Per-mutator usage counters for one run. Returned alongside the
/// trajectory rather than held in process-wide state, so runs stay
/// independently reproducible.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MutationReport {
    pub by_mutator: BTreeMap<String, MutatorStats>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MutatorStats {
    /// Times this mutator was applied.
    pub applied: u64,
    /// Times a child produced by this mutator improved the run's best score.
    pub improved: u64,
    /// Times the collaborator's response was unusable and the parent text
    /// was kept.
    pub fallbacks: u64,
}

impl MutationReport {
    pub fn record_applied(&mut self, name: &str) {
        self.by_mutator.entry(name.into()).or_default().applied += 1;
    }

    pub fn record_improved(&mut self, name: &str) {
        self.by_mutator.entry(name.into()).or_default().improved += 1;
    }

    pub fn record_fallback(&mut self, name: &str) {
        self.by_mutator.entry(name.into()).or_default().fallbacks += 1;
    }

    pub fn total_applied(&self) -> u64 {
        self.by_mutator.values().map(|s| s.applied).sum()
    }
}

/// The engine-facing mutation capability: a set of named styles over one
/// shared backend. Every application produces a *new* `Instruction` and
/// charges the meter, falling back to the parent's text when the backend
/// response is malformed or the call fails outright.
pub struct MutatorSet {
    backend: Arc<dyn RewriteBackend>,
    specs: Vec<MutatorSpec>,
}

impl MutatorSet {
    pub fn new(backend: Arc<dyn RewriteBackend>, specs: Vec<MutatorSpec>) -> Self {
        let specs = if specs.is_empty() {
            MutatorSpec::default_set()
        } else {
            specs
        };
        Self { backend, specs }
    }

    pub fn with_defaults(backend: Arc<dyn RewriteBackend>) -> Self {
        Self::new(backend, MutatorSpec::default_set())
    }

    pub fn specs(&self) -> &[MutatorSpec] {
        &self.specs
    }

    /// Pick one mutator uniformly at random.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> &MutatorSpec {
        &self.specs[rng.gen_range(0..self.specs.len())]
    }

    /// Apply a mutator to `parent`, returning a child with a fresh id.
    /// Never fails: unusable responses degrade to the parent text, and the
    /// cost actually incurred is still charged to the meter.
    pub async fn apply(
        &self,
        spec: &MutatorSpec,
        parent: &Instruction,
        meter: &mut TokenMeter,
        report: &mut MutationReport,
    ) -> Instruction {
        report.record_applied(&spec.name);

        match self.backend.rewrite(&parent.text, &spec.guidance).await {
            Ok(rewrite) => {
                meter.add(rewrite.cost as i64);
                let text = sanitize_rewrite(&rewrite.text);
                if text.is_empty() {
                    tracing::warn!(
                        mutator = %spec.name,
                        "Unusable rewrite response, keeping parent text"
                    );
                    report.record_fallback(&spec.name);
                    Instruction::new(parent.text.clone())
                } else {
                    tracing::debug!(
                        mutator = %spec.name,
                        child = truncate_str(&text, 80),
                        "Mutation applied"
                    );
                    Instruction::new(text)
                }
            }
            Err(e) => {
                tracing::warn!(mutator = %spec.name, "Rewrite failed: {}, keeping parent text", e);
                report.record_fallback(&spec.name);
                Instruction::new(parent.text.clone())
            }
        }
    }

    /// Plain paraphrase, used by the APE-style search and arm seeding.
    pub async fn paraphrase(
        &self,
        parent: &Instruction,
        meter: &mut TokenMeter,
        report: &mut MutationReport,
    ) -> Instruction {
        let spec = MutatorSpec::new("paraphrase", PARAPHRASE_GUIDANCE);
        self.apply(&spec, parent, meter, report).await
    }
}

/// Strip code fences and wrapping quotes that models habitually add
/// around a rewritten instruction.
fn sanitize_rewrite(raw: &str) -> String {
    let mut text = raw.trim();

    if text.starts_with("```") {
        text = text.trim_start_matches("```");
        // Drop an optional language tag on the opening fence.
        if let Some(pos) = text.find('\n') {
            let (first, rest) = text.split_at(pos);
            if !first.contains(' ') && first.len() < 16 {
                text = rest;
            }
        }
        text = text.trim_end_matches("```");
        text = text.trim();
    }

    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        text = &text[1..text.len() - 1];
    }

    text.trim().to_string()
}

/// Default `RewriteBackend` delegating to a model provider.
pub struct ModelRewriter {
    provider: Arc<dyn ModelProvider>,
    model: String,
}

impl ModelRewriter {
    pub fn new(provider: Arc<dyn ModelProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

#[async_trait]
impl RewriteBackend for ModelRewriter {
    async fn rewrite(&self, parent: &str, guidance: &str) -> Result<Rewrite, PromptuneError> {
        let prompt = format!(
            "Rewrite the instruction below.\n\n\
             Guidance: {guidance}\n\n\
             Keep the original intent and any declared output format \
             requirements intact. Reply with the rewritten instruction only. \
             No preamble, no quotes, no explanation.\n\n\
             Instruction:\n{parent}"
        );

        let response = self
            .provider
            .chat(ChatRequest {
                model: self.model.clone(),
                messages: vec![Message::user(prompt)],
                max_tokens: Some(500),
                temperature: Some(0.9),
                system: None,
            })
            .await?;

        Ok(Rewrite {
            cost: response.usage.total() as u64,
            text: response.content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoBackend {
        reply: String,
        cost: u64,
    }

    #[async_trait]
    impl RewriteBackend for EchoBackend {
        async fn rewrite(&self, _parent: &str, _guidance: &str) -> Result<Rewrite, PromptuneError> {
            Ok(Rewrite {
                text: self.reply.clone(),
                cost: self.cost,
            })
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl RewriteBackend for FailingBackend {
        async fn rewrite(&self, _parent: &str, _guidance: &str) -> Result<Rewrite, PromptuneError> {
            Err(PromptuneError::Provider {
                provider: "test".into(),
                message: "boom".into(),
                retriable: false,
            })
        }
    }

    fn spec() -> MutatorSpec {
        MutatorSpec::new("concise", "shorter")
    }

    #[tokio::test]
    async fn test_apply_produces_new_instruction() {
        let set = MutatorSet::with_defaults(Arc::new(EchoBackend {
            reply: "Rewritten.".into(),
            cost: 30,
        }));
        let parent = Instruction::new("Original.");
        let mut meter = TokenMeter::new();
        let mut report = MutationReport::default();

        let child = set.apply(&spec(), &parent, &mut meter, &mut report).await;
        assert_eq!(child.text, "Rewritten.");
        assert_ne!(child.id, parent.id);
        assert_eq!(meter.snapshot(), 30);
        assert_eq!(report.by_mutator["concise"].applied, 1);
        assert_eq!(report.by_mutator["concise"].fallbacks, 0);
    }

    #[tokio::test]
    async fn test_apply_empty_response_falls_back_and_still_charges() {
        let set = MutatorSet::with_defaults(Arc::new(EchoBackend {
            reply: "   ".into(),
            cost: 12,
        }));
        let parent = Instruction::new("Keep me.");
        let mut meter = TokenMeter::new();
        let mut report = MutationReport::default();

        let child = set.apply(&spec(), &parent, &mut meter, &mut report).await;
        assert_eq!(child.text, "Keep me.");
        assert_ne!(child.id, parent.id);
        assert_eq!(meter.snapshot(), 12);
        assert_eq!(report.by_mutator["concise"].fallbacks, 1);
    }

    #[tokio::test]
    async fn test_apply_backend_failure_falls_back() {
        let set = MutatorSet::with_defaults(Arc::new(FailingBackend));
        let parent = Instruction::new("Keep me.");
        let mut meter = TokenMeter::new();
        let mut report = MutationReport::default();

        let child = set.apply(&spec(), &parent, &mut meter, &mut report).await;
        assert_eq!(child.text, "Keep me.");
        assert_eq!(meter.snapshot(), 0);
        assert_eq!(report.by_mutator["concise"].fallbacks, 1);
    }

    #[test]
    fn test_sanitize_strips_fences_and_quotes() {
        assert_eq!(sanitize_rewrite("```\nDo the task.\n```"), "Do the task.");
        assert_eq!(sanitize_rewrite("\"Do the task.\""), "Do the task.");
        assert_eq!(sanitize_rewrite("  Do the task.  "), "Do the task.");
    }

    #[test]
    fn test_sanitize_keeps_inner_quotes() {
        assert_eq!(sanitize_rewrite("Say \"yes\" or \"no\"."), "Say \"yes\" or \"no\".");
    }

    #[test]
    fn test_default_set_has_paraphrase() {
        let specs = MutatorSpec::default_set();
        assert!(specs.iter().any(|s| s.name == "paraphrase"));
        assert!(specs.len() >= 4);
    }

    #[test]
    fn test_empty_spec_list_falls_back_to_defaults() {
        let set = MutatorSet::new(Arc::new(FailingBackend), vec![]);
        assert!(!set.specs().is_empty());
    }

    #[test]
    fn test_pick_is_uniform_over_specs() {
        use rand::rngs::StdRng;
        use rand::SeedableRng;
        let set = MutatorSet::new(
            Arc::new(FailingBackend),
            vec![MutatorSpec::new("a", "a"), MutatorSpec::new("b", "b")],
        );
        let mut rng = StdRng::seed_from_u64(1);
        let mut seen_a = false;
        let mut seen_b = false;
        for _ in 0..100 {
            match set.pick(&mut rng).name.as_str() {
                "a" => seen_a = true,
                "b" => seen_b = true,
                _ => unreachable!(),
            }
        }
        assert!(seen_a && seen_b);
    }

    #[tokio::test]
    async fn test_rewriter_prompt_is_well_formed() {
        use crate::provider::{ChatResponse, ModelProvider, StopReason, TokenUsage};
        use std::sync::Mutex;

        struct CapturingProvider {
            seen: Mutex<Vec<String>>,
        }

        #[async_trait]
        impl ModelProvider for CapturingProvider {
            fn id(&self) -> &str {
                "capture"
            }
            fn name(&self) -> &str {
                "Capture"
            }
            async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, PromptuneError> {
                self.seen
                    .lock()
                    .unwrap()
                    .extend(request.messages.iter().map(|m| m.content.clone()));
                Ok(ChatResponse {
                    content: "Rewritten.".into(),
                    usage: TokenUsage {
                        input_tokens: 5,
                        output_tokens: 5,
                    },
                    stop_reason: StopReason::EndTurn,
                })
            }
        }

        let provider = Arc::new(CapturingProvider {
            seen: Mutex::new(Vec::new()),
        });
        let rewriter = ModelRewriter::new(provider.clone(), "test-model");
        rewriter.rewrite("Solve it.", "shorter").await.unwrap();

        let seen = provider.seen.lock().unwrap();
        let prompt = &seen[0];
        assert!(prompt.contains("instruction only. No preamble"));
        assert!(!prompt.contains(" ."));
        assert!(prompt.contains("Guidance: shorter"));
        assert!(prompt.ends_with("Instruction:\nSolve it."));
    }

    #[test]
    fn test_report_totals() {
        let mut r = MutationReport::default();
        r.record_applied("x");
        r.record_applied("y");
        r.record_improved("x");
        assert_eq!(r.total_applied(), 2);
        assert_eq!(r.by_mutator["x"].improved, 1);
    }
}
