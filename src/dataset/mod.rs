// src/dataset/mod.rs — Benchmark dataset loading

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::infra::errors::PromptuneError;

/// One evaluation example: a rendered task input and its gold answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Example {
    pub input: String,
    pub target: String,
}

/// Supported benchmark tasks. Each maps a task-specific JSON record shape
/// onto the uniform `Example`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Task {
    /// PIQA: physical commonsense, A/B solution choice.
    Piqa,
    /// BoolQ: yes/no question answering over a passage.
    Boolq,
    /// HellaSwag: 4-way sentence completion.
    Hellaswag,
    /// GSM8K: grade-school math with a numeric answer.
    Gsm8k,
}

/// Load a dataset file for the given task. Files are JSON arrays as produced
/// by the benchmark download tooling.
pub fn load(task: Task, path: &Path) -> Result<Vec<Example>, PromptuneError> {
    let content = std::fs::read_to_string(path)?;
    let records: Vec<serde_json::Value> = serde_json::from_str(&content)
        .map_err(|e| PromptuneError::Dataset(format!("{}: {}", path.display(), e)))?;

    let examples: Vec<Example> = records
        .iter()
        .enumerate()
        .map(|(i, rec)| {
            render(task, rec)
                .ok_or_else(|| PromptuneError::Dataset(format!("record {} is malformed", i)))
        })
        .collect::<Result<_, _>>()?;

    if examples.is_empty() {
        return Err(PromptuneError::Dataset(format!(
            "{} contains no examples",
            path.display()
        )));
    }

    Ok(examples)
}

fn render(task: Task, rec: &serde_json::Value) -> Option<Example> {
    match task {
        Task::Piqa => {
            let goal = rec["goal"].as_str()?;
            let sol1 = rec["sol1"].as_str()?;
            let sol2 = rec["sol2"].as_str()?;
            let label = rec["label"].as_str()?;
            Some(Example {
                input: format!("Goal: {goal}\nSolution 0: {sol1}\nSolution 1: {sol2}"),
                target: label.to_string(),
            })
        }
        Task::Boolq => {
            let question = rec["question"].as_str()?;
            let passage = rec["passage"].as_str()?;
            let answer = rec["answer"].as_bool()?;
            Some(Example {
                input: format!("Passage: {passage}\nQuestion: {question}"),
                target: if answer { "true".into() } else { "false".into() },
            })
        }
        Task::Hellaswag => {
            let context = rec["context"].as_str()?;
            let endings = rec["endings"].as_array()?;
            let label = rec["label"].as_str()?;
            let mut input = format!("Context: {context}\n");
            for (i, ending) in endings.iter().enumerate() {
                input.push_str(&format!("Ending {}: {}\n", i, ending.as_str()?));
            }
            Some(Example {
                input,
                target: label.to_string(),
            })
        }
        Task::Gsm8k => {
            let question = rec["question"].as_str()?;
            let answer = rec["answer"].as_f64()?;
            Some(Example {
                input: question.to_string(),
                target: format_numeric(answer),
            })
        }
    }
}

/// Render a numeric gold answer the way a model would write it: integral
/// values without a trailing `.0`.
fn format_numeric(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}
