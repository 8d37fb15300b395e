// src/core/mod.rs — Optimization engine: budget accounting, mutation,
// fitness caching, and the three search algorithms

pub mod fitness;
pub mod meter;
pub mod mutate;
pub mod paraphrase;
pub mod rng;
pub mod thompson;
pub mod tournament;
pub mod types;
