// src/cli/run.rs — `promptune run`: load data, resolve a provider, and
// drive the chosen search algorithm

use std::path::PathBuf;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::cli::Algo;
use crate::core::mutate::{ModelRewriter, MutationReport, MutatorSet};
use crate::core::paraphrase::paraphrase_search;
use crate::core::thompson::{thompson_sampling, ThompsonConfig};
use crate::core::tournament::{tournament_evolution, TournamentConfig};
use crate::core::types::{Instruction, OptimizeOutcome, DEFAULT_INSTRUCTION};
use crate::dataset::{self, Task};
use crate::evaluator::ModelEvaluator;
use crate::infra::config::Config;
use crate::provider::resolver;
use crate::util::fmt_tokens;

pub struct RunArgs {
    pub algo: Algo,
    pub task: Task,
    pub dataset: PathBuf,
    pub seed: Vec<String>,
    pub budget: Option<u64>,
    pub limit: Option<usize>,
    pub rng_seed: Option<u64>,
    pub out: Option<PathBuf>,
}

pub async fn run_optimize(args: RunArgs, config: &Config) -> anyhow::Result<()> {
    let mut dataset = dataset::load(args.task, &args.dataset)?;
    if let Some(limit) = args.limit {
        dataset.truncate(limit);
    }
    tracing::info!(examples = dataset.len(), task = ?args.task, "Dataset loaded");

    let (provider, model) = resolver::resolve(&config.retry).await?;
    let rewriter_model = config
        .models
        .rewriter
        .clone()
        .or_else(|| config.models.target.clone())
        .unwrap_or_else(|| model.clone());
    let target_model = config.models.target.clone().unwrap_or(model);

    let evaluator = ModelEvaluator::new(provider.clone(), target_model);
    let mutators = MutatorSet::with_defaults(Arc::new(ModelRewriter::new(provider, rewriter_model)));

    // CLI budget wins over config; 0 means unlimited where the algorithm
    // allows it (Thompson still enforces its built-in ceiling).
    let budget = match args.budget {
        Some(0) => None,
        Some(n) => Some(n),
        None => config.search.token_budget,
    };

    let mut rng = match args.rng_seed.or(config.search.seed) {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    let seeds: Vec<Instruction> = if args.seed.is_empty() {
        vec![Instruction::new(DEFAULT_INSTRUCTION)]
    } else {
        args.seed.iter().map(Instruction::new).collect()
    };

    let outcome = match args.algo {
        Algo::Ape => {
            paraphrase_search(
                seeds[0].clone(),
                config.search.paraphrase_count,
                &dataset,
                &evaluator,
                &mutators,
            )
            .await?
        }
        Algo::Evolve => {
            let cfg = TournamentConfig {
                budget,
                averaging: config.search.averaging,
            };
            tournament_evolution(seeds, &dataset, &evaluator, &mutators, &cfg, &mut rng).await?
        }
        Algo::Thompson => {
            let cfg = ThompsonConfig {
                budget,
                extra_arms: config.search.extra_arms,
                prior: config.prior.clone(),
            };
            thompson_sampling(seeds, &dataset, &evaluator, &mutators, &cfg, &mut rng).await?
        }
    };

    print_summary(&outcome);

    if let Some(path) = args.out {
        let json = serde_json::to_string_pretty(&outcome)?;
        std::fs::write(&path, json)?;
        println!("\nFull outcome written to {}", path.display());
    }

    Ok(())
}

fn print_summary(outcome: &OptimizeOutcome) {
    println!("Best instruction ({:.3}):", outcome.best_score);
    println!("  {}", outcome.best.text);
    println!();
    println!(
        "Tokens spent: {}  Snapshots: {}",
        fmt_tokens(outcome.tokens_spent),
        outcome.trajectory.len()
    );
    print_mutations(&outcome.mutations);
}

fn print_mutations(report: &MutationReport) {
    if report.by_mutator.is_empty() {
        return;
    }
    println!("\nMutations:");
    for (name, stats) in &report.by_mutator {
        println!(
            "  {:<14} applied {:>4}  improved {:>4}  fallbacks {:>4}",
            name, stats.applied, stats.improved, stats.fallbacks
        );
    }
}

pub async fn run_doctor(config: &Config) -> anyhow::Result<()> {
    match resolver::resolve(&config.retry).await {
        Ok((provider, model)) => {
            println!("Provider: {} ({})", provider.name(), provider.id());
            println!("Model:    {model}");
            Ok(())
        }
        Err(e) => {
            println!("No usable provider: {e}");
            println!("Set OPENAI_API_KEY, PROMPTUNE_BASE_URL, or start an Ollama server.");
            Ok(())
        }
    }
}
