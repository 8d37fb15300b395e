// src/core/types.rs — Shared engine types

use serde::{Deserialize, Serialize};

use super::mutate::MutationReport;

/// Substituted when a search is started with no seed instructions.
pub const DEFAULT_INSTRUCTION: &str =
    "Answer the question. Respond with only the final answer and nothing else.";

/// An instruction under optimization. Immutable once created: a mutation
/// always produces a new `Instruction` with a fresh id, never an in-place
/// edit, so populations and arm sets can locate members by identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instruction {
    pub id: String,
    pub text: String,
}

impl Instruction {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
        }
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// One point on a run's convergence trajectory: the best instruction held at
/// that moment, its score when recorded, and the cumulative token spend.
/// Appended after every completed unit of work, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BestSnapshot {
    pub instruction: Instruction,
    pub score: f64,
    pub tokens: u64,
}

/// What every search entry point returns: a usable best instruction plus the
/// full audit trail, even under budget exhaustion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeOutcome {
    pub best: Instruction,
    pub best_score: f64,
    pub trajectory: Vec<BestSnapshot>,
    pub tokens_spent: u64,
    pub mutations: MutationReport,
}
