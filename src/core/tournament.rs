// src/core/tournament.rs — Binary-tournament evolutionary search

use rand::Rng;

use super::fitness::{fitness, FitnessCache};
use super::meter::TokenMeter;
use super::mutate::{MutationReport, MutatorSet};
use super::types::{BestSnapshot, Instruction, OptimizeOutcome, DEFAULT_INSTRUCTION};
use crate::dataset::Example;
use crate::evaluator::Evaluator;
use crate::infra::config::AveragingPolicy;
use crate::infra::errors::PromptuneError;

#[derive(Debug, Clone)]
pub struct TournamentConfig {
    pub budget: Option<u64>,
    pub averaging: AveragingPolicy,
}

impl Default for TournamentConfig {
    fn default() -> Self {
        Self {
            budget: Some(100_000),
            averaging: AveragingPolicy::EvaluatedOnly,
        }
    }
}

/// Evolve a fixed-size population of instructions by binary tournaments.
///
/// Each round draws two members uniformly at random with replacement,
/// mutates the winner, and replaces the loser's slot with the child. The
/// population never grows or shrinks; losers are simply dropped (their text
/// may linger as a fitness-cache key). One snapshot is appended per round
/// whether or not the best changed, so the trajectory plots directly
/// against cumulative cost.
pub async fn tournament_evolution<R: Rng>(
    seeds: Vec<Instruction>,
    dataset: &[Example],
    evaluator: &dyn Evaluator,
    mutators: &MutatorSet,
    cfg: &TournamentConfig,
    rng: &mut R,
) -> Result<OptimizeOutcome, PromptuneError> {
    let mut meter = TokenMeter::new();
    let mut cache = FitnessCache::new();
    let mut report = MutationReport::default();

    let mut population = if seeds.is_empty() {
        vec![Instruction::new(DEFAULT_INSTRUCTION)]
    } else {
        seeds
    };
    let population_size = population.len();

    let mut best = population[0].clone();
    let mut best_score = fitness(
        &best,
        dataset,
        evaluator,
        &mut cache,
        &mut meter,
        cfg.budget,
        cfg.averaging,
    )
    .await?;

    let mut trajectory = vec![BestSnapshot {
        instruction: best.clone(),
        score: best_score,
        tokens: meter.snapshot(),
    }];

    let mut round = 0u64;
    while meter.can(cfg.budget) {
        round += 1;

        let ia = rng.gen_range(0..population.len());
        let ib = rng.gen_range(0..population.len());

        let fa = fitness(
            &population[ia],
            dataset,
            evaluator,
            &mut cache,
            &mut meter,
            cfg.budget,
            cfg.averaging,
        )
        .await?;
        if !meter.can(cfg.budget) {
            break;
        }

        let fb = fitness(
            &population[ib],
            dataset,
            evaluator,
            &mut cache,
            &mut meter,
            cfg.budget,
            cfg.averaging,
        )
        .await?;
        if !meter.can(cfg.budget) {
            break;
        }

        // Ties favor `a`.
        let (winner_idx, loser_idx) = if fa >= fb { (ia, ib) } else { (ib, ia) };

        // The loser is located by identity, not by value: duplicated text in
        // the population must not redirect the replacement to another slot.
        let loser_id = population[loser_idx].id.clone();
        let loser_slot = population
            .iter()
            .position(|m| m.id == loser_id)
            .unwrap_or(loser_idx);

        let spec = mutators.pick(rng).clone();
        let child = mutators
            .apply(&spec, &population[winner_idx], &mut meter, &mut report)
            .await;
        population[loser_slot] = child.clone();

        let child_score = fitness(
            &child,
            dataset,
            evaluator,
            &mut cache,
            &mut meter,
            cfg.budget,
            cfg.averaging,
        )
        .await?;

        if child_score > best_score {
            tracing::debug!(round, score = child_score, "New best instruction");
            best = child;
            best_score = child_score;
            report.record_improved(&spec.name);
        }

        trajectory.push(BestSnapshot {
            instruction: best.clone(),
            score: best_score,
            tokens: meter.snapshot(),
        });

        debug_assert_eq!(population.len(), population_size);
    }

    tracing::info!(
        rounds = round,
        best_score,
        tokens = meter.snapshot(),
        "Tournament evolution finished"
    );

    Ok(OptimizeOutcome {
        best,
        best_score,
        trajectory,
        tokens_spent: meter.snapshot(),
        mutations: report,
    })
}
