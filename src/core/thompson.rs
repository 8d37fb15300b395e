// src/core/thompson.rs — Thompson sampling over instruction arms

use rand::Rng;

use super::meter::TokenMeter;
use super::mutate::{MutationReport, MutatorSet};
use super::rng::{inverse_gamma, normal};
use super::types::{BestSnapshot, Instruction, OptimizeOutcome, DEFAULT_INSTRUCTION};
use crate::dataset::Example;
use crate::evaluator::Evaluator;
use crate::infra::config::PriorConfig;
use crate::infra::errors::PromptuneError;

/// Budget substituted when the caller passes none. The sampler pulls one
/// example per iteration, so an unbounded run would never converge on its
/// own; a finite ceiling is always enforced.
pub const DEFAULT_THOMPSON_BUDGET: u64 = 100_000;

/// Normal-Inverse-Gamma posterior over an arm's unknown mean reward and
/// variance. Conjugate to Gaussian observations, so each update is a few
/// arithmetic ops on the four hyperparameters.
#[derive(Debug, Clone, PartialEq)]
pub struct NigPosterior {
    pub mu: f64,
    pub kappa: f64,
    pub alpha: f64,
    pub beta: f64,
}

impl NigPosterior {
    pub fn from_prior(prior: &PriorConfig) -> Self {
        Self {
            mu: prior.mu,
            kappa: prior.kappa,
            alpha: prior.alpha,
            beta: prior.beta,
        }
    }

    /// Fold one observation into the posterior.
    pub fn update(&mut self, x: f64) {
        let kappa_next = self.kappa + 1.0;
        let mu_next = (self.kappa * self.mu + x) / kappa_next;
        let delta = x - self.mu;
        self.beta += self.kappa * delta * delta / (2.0 * kappa_next);
        self.alpha += 0.5;
        self.kappa = kappa_next;
        self.mu = mu_next;
    }

    /// Draw one plausible mean reward: sample a variance from the
    /// InverseGamma marginal, then a mean from the conditional Normal.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let variance = inverse_gamma(rng, self.alpha, self.beta);
        normal(rng, self.mu, variance / self.kappa)
    }

    /// Posterior mean of the arm's reward.
    pub fn mean(&self) -> f64 {
        self.mu
    }
}

#[derive(Debug, Clone)]
struct Arm {
    instruction: Instruction,
    posterior: NigPosterior,
    /// Name of the mutator that spawned this arm, when it was not a seed.
    origin: Option<String>,
    credited: bool,
}

#[derive(Debug, Clone)]
pub struct ThompsonConfig {
    pub budget: Option<u64>,
    pub extra_arms: usize,
    pub prior: PriorConfig,
}

impl Default for ThompsonConfig {
    fn default() -> Self {
        Self {
            budget: None,
            extra_arms: 4,
            prior: PriorConfig::default(),
        }
    }
}

/// Treat candidate instructions as bandit arms and spend the budget where
/// the posterior says the payoff is. Each pull evaluates the sampled-best
/// arm on a single random example, so cheap arms are abandoned quickly and
/// promising ones accumulate evidence.
pub async fn thompson_sampling<R: Rng>(
    seeds: Vec<Instruction>,
    dataset: &[Example],
    evaluator: &dyn Evaluator,
    mutators: &MutatorSet,
    cfg: &ThompsonConfig,
    rng: &mut R,
) -> Result<OptimizeOutcome, PromptuneError> {
    let budget = Some(cfg.budget.unwrap_or(DEFAULT_THOMPSON_BUDGET));
    let mut meter = TokenMeter::new();
    let mut report = MutationReport::default();

    let seeds = if seeds.is_empty() {
        vec![Instruction::new(DEFAULT_INSTRUCTION)]
    } else {
        seeds
    };

    let mut arms: Vec<Arm> = seeds
        .iter()
        .map(|s| Arm {
            instruction: s.clone(),
            posterior: NigPosterior::from_prior(&cfg.prior),
            origin: None,
            credited: false,
        })
        .collect();

    // Widen the pool by mutating the first seed. Each rewrite spends
    // tokens, so the expansion itself is budget-checked.
    for _ in 0..cfg.extra_arms {
        if !meter.can(budget) {
            break;
        }
        let spec = mutators.pick(rng).clone();
        let child = mutators
            .apply(&spec, &seeds[0], &mut meter, &mut report)
            .await;
        arms.push(Arm {
            instruction: child,
            posterior: NigPosterior::from_prior(&cfg.prior),
            origin: Some(spec.name),
            credited: false,
        });
    }

    // Best-so-far is a running maximum over the per-pull argmax posterior
    // mean. An arm's mean can drop after a bad observation; the recorded
    // best never does, so the trajectory is monotone like the tournament's.
    let mut best = arms[0].instruction.clone();
    let mut best_score = arms[0].posterior.mean();
    let mut trajectory = Vec::new();
    let mut pulls = 0u64;

    while meter.can(budget) {
        if dataset.is_empty() {
            break;
        }
        pulls += 1;

        // Sample one plausible mean per arm, play the argmax.
        let mut chosen = 0usize;
        let mut chosen_draw = f64::NEG_INFINITY;
        for (i, arm) in arms.iter().enumerate() {
            let draw = arm.posterior.sample(rng);
            if draw > chosen_draw {
                chosen = i;
                chosen_draw = draw;
            }
        }

        let example = &dataset[rng.gen_range(0..dataset.len())];
        let scored = evaluator
            .evaluate(&arms[chosen].instruction.text, example)
            .await?;
        meter.add(scored.cost as i64);
        arms[chosen].posterior.update(scored.score);

        // Rank arms by posterior mean; ties keep the earlier arm. The
        // best-so-far only updates on a strict improvement.
        let mut top = 0usize;
        for i in 1..arms.len() {
            if arms[i].posterior.mean() > arms[top].posterior.mean() {
                top = i;
            }
        }
        if arms[top].posterior.mean() > best_score {
            best_score = arms[top].posterior.mean();
            best = arms[top].instruction.clone();
            if let (Some(name), false) = (&arms[top].origin, arms[top].credited) {
                report.record_improved(name);
                arms[top].credited = true;
            }
        }

        trajectory.push(BestSnapshot {
            instruction: best.clone(),
            score: best_score,
            tokens: meter.snapshot(),
        });
    }

    tracing::info!(
        pulls,
        arms = arms.len(),
        best_score,
        tokens = meter.snapshot(),
        "Thompson sampling finished"
    );

    Ok(OptimizeOutcome {
        best,
        best_score,
        trajectory,
        tokens_spent: meter.snapshot(),
        mutations: report,
    })
}
