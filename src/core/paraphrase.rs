// src/core/paraphrase.rs — APE-style paraphrase-and-rank search

use super::fitness::{fitness, FitnessCache};
use super::meter::TokenMeter;
use super::mutate::{MutationReport, MutatorSet};
use super::types::{BestSnapshot, Instruction, OptimizeOutcome};
use crate::dataset::Example;
use crate::evaluator::Evaluator;
use crate::infra::config::AveragingPolicy;
use crate::infra::errors::PromptuneError;

/// Generate `n` paraphrases of `seed`, fully score `{seed} ∪ paraphrases`
/// over the whole dataset, and return the best candidate.
///
/// Not budget-bounded: every candidate gets a complete pass. Ties go to the
/// first candidate encountered with the maximum score (strict `>` updates
/// only), and the seed is scored first. The trajectory holds exactly one
/// snapshot summarizing the whole search.
pub async fn paraphrase_search(
    seed: Instruction,
    n: usize,
    dataset: &[Example],
    evaluator: &dyn Evaluator,
    mutators: &MutatorSet,
) -> Result<OptimizeOutcome, PromptuneError> {
    let mut meter = TokenMeter::new();
    let mut report = MutationReport::default();
    let mut cache = FitnessCache::new();

    let mut candidates = Vec::with_capacity(n + 1);
    candidates.push(seed);
    for _ in 0..n {
        let paraphrase = mutators
            .paraphrase(&candidates[0], &mut meter, &mut report)
            .await;
        candidates.push(paraphrase);
    }

    tracing::debug!(candidates = candidates.len(), "Scoring paraphrase candidates");

    let mut best_idx = 0;
    let mut best_score = f64::NEG_INFINITY;
    for (i, candidate) in candidates.iter().enumerate() {
        let score = fitness(
            candidate,
            dataset,
            evaluator,
            &mut cache,
            &mut meter,
            None,
            AveragingPolicy::EvaluatedOnly,
        )
        .await?;
        if score > best_score {
            best_idx = i;
            best_score = score;
        }
    }

    let best = candidates.swap_remove(best_idx);
    let trajectory = vec![BestSnapshot {
        instruction: best.clone(),
        score: best_score,
        tokens: meter.snapshot(),
    }];

    Ok(OptimizeOutcome {
        best,
        best_score,
        trajectory,
        tokens_spent: meter.snapshot(),
        mutations: report,
    })
}
