// src/core/fitness.rs — Dataset-averaged fitness with memoization

use std::collections::HashMap;

use super::meter::TokenMeter;
use super::types::Instruction;
use crate::dataset::Example;
use crate::evaluator::Evaluator;
use crate::infra::config::AveragingPolicy;
use crate::infra::errors::PromptuneError;

/// Memoizes the averaged score for an exact instruction text. Two
/// instructions with identical text are fitness-equivalent for the whole
/// run, even when they are distinct `Instruction` objects. Evicted
/// population members may linger as dangling keys; that's fine, the cache's
/// working set is bounded by the fixed population size.
#[derive(Debug, Default)]
pub struct FitnessCache {
    scores: HashMap<String, f64>,
}

impl FitnessCache {
    pub fn new() -> Self {
        Self {
            scores: HashMap::new(),
        }
    }

    pub fn get(&self, text: &str) -> Option<f64> {
        self.scores.get(text).copied()
    }

    pub fn insert(&mut self, text: &str, score: f64) {
        self.scores.insert(text.to_string(), score);
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// Compute (or fetch) the dataset-averaged fitness of an instruction.
///
/// Cache hits cost nothing. On a miss, examples are evaluated in dataset
/// order with a budget check after every call; when the budget runs out
/// mid-pass, the average covers only what was actually evaluated (under
/// the default `EvaluatedOnly` policy) and is cached like a full result.
pub async fn fitness(
    instruction: &Instruction,
    dataset: &[Example],
    evaluator: &dyn Evaluator,
    cache: &mut FitnessCache,
    meter: &mut TokenMeter,
    budget: Option<u64>,
    policy: AveragingPolicy,
) -> Result<f64, PromptuneError> {
    if let Some(score) = cache.get(&instruction.text) {
        return Ok(score);
    }

    let mut sum = 0.0;
    let mut evaluated = 0usize;

    for example in dataset {
        let scored = evaluator.evaluate(&instruction.text, example).await?;
        meter.add(scored.cost as i64);
        sum += scored.score;
        evaluated += 1;

        if !meter.can(budget) {
            tracing::debug!(
                evaluated,
                total = dataset.len(),
                "Budget exhausted mid-fitness, truncating pass"
            );
            break;
        }
    }

    let divisor = match policy {
        AveragingPolicy::EvaluatedOnly => evaluated.max(1),
        AveragingPolicy::FullDataset => dataset.len().max(1),
    };
    let score = sum / divisor as f64;

    cache.insert(&instruction.text, score);
    Ok(score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};

    use crate::evaluator::Scored;

    /// Scores every example 1.0 at a fixed cost and counts calls.
    struct CountingEvaluator {
        cost: u64,
        calls: AtomicU64,
    }

    impl CountingEvaluator {
        fn new(cost: u64) -> Self {
            Self {
                cost,
                calls: AtomicU64::new(0),
            }
        }
    }

    #[async_trait]
    impl Evaluator for CountingEvaluator {
        async fn evaluate(
            &self,
            _instruction: &str,
            _example: &Example,
        ) -> Result<Scored, PromptuneError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Scored {
                score: 1.0,
                cost: self.cost,
            })
        }
    }

    fn dataset(n: usize) -> Vec<Example> {
        (0..n)
            .map(|i| Example {
                input: format!("q{i}"),
                target: "a".into(),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_full_pass_average() {
        let eval = CountingEvaluator::new(10);
        let mut cache = FitnessCache::new();
        let mut meter = TokenMeter::new();
        let inst = Instruction::new("x");

        let score = fitness(
            &inst,
            &dataset(8),
            &eval,
            &mut cache,
            &mut meter,
            None,
            AveragingPolicy::EvaluatedOnly,
        )
        .await
        .unwrap();

        assert_eq!(score, 1.0);
        assert_eq!(meter.snapshot(), 80);
        assert_eq!(eval.calls.load(Ordering::SeqCst), 8);
    }

    #[tokio::test]
    async fn test_cache_hit_does_no_work() {
        let eval = CountingEvaluator::new(10);
        let mut cache = FitnessCache::new();
        let mut meter = TokenMeter::new();
        let a = Instruction::new("same text");
        let b = Instruction::new("same text"); // distinct id, same text

        let ds = dataset(4);
        let s1 = fitness(&a, &ds, &eval, &mut cache, &mut meter, None, AveragingPolicy::EvaluatedOnly)
            .await
            .unwrap();
        let s2 = fitness(&b, &ds, &eval, &mut cache, &mut meter, None, AveragingPolicy::EvaluatedOnly)
            .await
            .unwrap();

        assert_eq!(s1, s2);
        assert_eq!(eval.calls.load(Ordering::SeqCst), 4); // one pass total
        assert_eq!(meter.snapshot(), 40); // second call was free
    }

    #[tokio::test]
    async fn test_truncated_pass_evaluated_only_average() {
        // Budget 25 with cost 10/call: stops after the 3rd call (total 30).
        let eval = CountingEvaluator::new(10);
        let mut cache = FitnessCache::new();
        let mut meter = TokenMeter::new();
        let inst = Instruction::new("x");

        let score = fitness(
            &inst,
            &dataset(8),
            &eval,
            &mut cache,
            &mut meter,
            Some(25),
            AveragingPolicy::EvaluatedOnly,
        )
        .await
        .unwrap();

        assert_eq!(eval.calls.load(Ordering::SeqCst), 3);
        // 3 x 1.0 / 3, no deflation.
        assert_eq!(score, 1.0);
    }

    #[tokio::test]
    async fn test_truncated_pass_full_dataset_average_deflates() {
        // Same truncation, but divided by the full dataset length.
        let eval = CountingEvaluator::new(10);
        let mut cache = FitnessCache::new();
        let mut meter = TokenMeter::new();
        let inst = Instruction::new("x");

        let score = fitness(
            &inst,
            &dataset(8),
            &eval,
            &mut cache,
            &mut meter,
            Some(25),
            AveragingPolicy::FullDataset,
        )
        .await
        .unwrap();

        assert_eq!(eval.calls.load(Ordering::SeqCst), 3);
        // 3 x 1.0 / 8, deflated by the unevaluated examples.
        assert!((score - 3.0 / 8.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_empty_dataset_scores_zero() {
        let eval = CountingEvaluator::new(10);
        let mut cache = FitnessCache::new();
        let mut meter = TokenMeter::new();
        let inst = Instruction::new("x");

        let score = fitness(
            &inst,
            &[],
            &eval,
            &mut cache,
            &mut meter,
            None,
            AveragingPolicy::EvaluatedOnly,
        )
        .await
        .unwrap();

        assert_eq!(score, 0.0);
        assert_eq!(meter.snapshot(), 0);
    }

    #[tokio::test]
    async fn test_evaluator_failure_propagates() {
        struct Broken;
        #[async_trait]
        impl Evaluator for Broken {
            async fn evaluate(
                &self,
                _instruction: &str,
                _example: &Example,
            ) -> Result<Scored, PromptuneError> {
                Err(PromptuneError::Evaluator {
                    instruction: "x".into(),
                    message: "down".into(),
                })
            }
        }

        let mut cache = FitnessCache::new();
        let mut meter = TokenMeter::new();
        let inst = Instruction::new("x");
        let err = fitness(
            &inst,
            &dataset(2),
            &Broken,
            &mut cache,
            &mut meter,
            None,
            AveragingPolicy::EvaluatedOnly,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PromptuneError::Evaluator { .. }));
        assert!(cache.is_empty());
    }
}
