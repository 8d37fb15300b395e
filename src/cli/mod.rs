// src/cli/mod.rs — CLI definition (clap derive)

pub mod run;

use clap::{Parser, Subcommand, ValueEnum};

use crate::dataset::Task;

#[derive(Parser)]
#[command(name = "promptune", about = "Budget-bounded prompt optimization", version)]
pub struct Cli {
    /// Config file path (defaults to ./promptune.toml when present)
    #[arg(long)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Optimize an instruction against a labeled dataset
    Run {
        /// Search algorithm
        #[arg(long, value_enum, default_value = "evolve")]
        algo: Algo,

        /// Dataset task shape
        #[arg(long, value_enum)]
        task: Task,

        /// Path to the dataset JSON file
        #[arg(long)]
        dataset: std::path::PathBuf,

        /// Seed instruction (repeatable; a built-in default is used if omitted)
        #[arg(short, long)]
        seed: Vec<String>,

        /// Token budget override (0 = unlimited where the algorithm allows)
        #[arg(short, long)]
        budget: Option<u64>,

        /// Cap the number of dataset examples used
        #[arg(long)]
        limit: Option<usize>,

        /// RNG seed for a reproducible run
        #[arg(long)]
        rng_seed: Option<u64>,

        /// Write the full outcome (best, trajectory, mutation stats) as JSON
        #[arg(short, long)]
        out: Option<std::path::PathBuf>,
    },

    /// Check which model provider would be used
    Doctor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Algo {
    /// Paraphrase the seed N times, keep the best (APE style)
    Ape,
    /// Binary-tournament evolution over a fixed population
    Evolve,
    /// Thompson sampling over instruction arms
    Thompson,
}
