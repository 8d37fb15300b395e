// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub models: ModelsConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub prior: PriorConfig,

    #[serde(default)]
    pub retry: RetrySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Downstream model executing the instruction under evaluation.
    pub target: Option<String>,
    /// Model used for guided rewrites. Falls back to `target` when unset.
    pub rewriter: Option<String>,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            target: None,
            rewriter: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Hard token ceiling for budget-bounded algorithms. `None` lets
    /// Thompson sampling fall back to its built-in finite default.
    pub token_budget: Option<u64>,
    /// Paraphrase count for the APE-style search.
    pub paraphrase_count: usize,
    /// Extra bandit arms seeded by mutating the first seed instruction.
    pub extra_arms: usize,
    /// How truncated fitness evaluations are averaged.
    pub averaging: AveragingPolicy,
    /// RNG seed for replayable runs. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            token_budget: Some(100_000),
            paraphrase_count: 8,
            extra_arms: 4,
            averaging: AveragingPolicy::EvaluatedOnly,
            seed: None,
        }
    }
}

/// Policy for averaging a fitness score when the token budget truncates the
/// dataset pass. `EvaluatedOnly` divides by the number of examples actually
/// scored. `FullDataset` divides by the full dataset length, which deflates
/// the score of a truncated pass; it exists for comparing against runs that
/// were measured that way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AveragingPolicy {
    EvaluatedOnly,
    FullDataset,
}

/// Backoff knobs for the provider retry wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub backoff_factor: f64,
    pub max_delay_ms: u64,
    pub jitter_fraction: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay_ms: 1_000,
            backoff_factor: 2.0,
            max_delay_ms: 20_000,
            jitter_fraction: 0.2,
        }
    }
}

/// Normal-Inverse-Gamma prior shared by every fresh bandit arm.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorConfig {
    pub mu: f64,
    pub kappa: f64,
    pub alpha: f64,
    pub beta: f64,
}

impl Default for PriorConfig {
    fn default() -> Self {
        // Weak prior centered at a mid-range score with high uncertainty.
        Self {
            mu: 0.5,
            kappa: 1e-3,
            alpha: 1.0,
            beta: 1.0,
        }
    }
}

impl Config {
    /// Load config from `./promptune.toml`, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = Path::new("promptune.toml");
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
