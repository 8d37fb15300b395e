// src/lib.rs — Library root for Promptune

pub mod cli;
pub mod core;
pub mod dataset;
pub mod evaluator;
pub mod infra;
pub mod provider;
pub mod util;
