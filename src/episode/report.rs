//! Printable summaries of generated episodes.

use std::fmt;

use serde::Serialize;

use super::{BatchedStep, EpisodeStep};

/// Shape and labels of one episode position.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StepSummary {
    pub input_shape: Vec<usize>,
    pub previous_labels: Vec<[f64; 2]>,
    pub labels: Vec<[f64; 2]>,
}

/// Shapes and labels of a whole episode, without pixel data.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EpisodeSummary {
    pub task: usize,
    pub task_id: String,
    /// Samples per position (1 for sequential episodes).
    pub batch_size: usize,
    pub steps: Vec<StepSummary>,
}

impl EpisodeSummary {
    pub fn sequential(task: usize, task_id: impl Into<String>, steps: &[EpisodeStep]) -> Self {
        Self {
            task,
            task_id: task_id.into(),
            batch_size: 1,
            steps: steps
                .iter()
                .map(|step| StepSummary {
                    input_shape: step.input.shape().to_vec(),
                    previous_labels: vec![step.previous_label],
                    labels: vec![step.label],
                })
                .collect(),
        }
    }

    pub fn batched(
        task: usize,
        task_id: impl Into<String>,
        batch_size: usize,
        steps: &[BatchedStep],
    ) -> Self {
        let rows = |matrix: &ndarray::Array2<f64>| -> Vec<[f64; 2]> {
            matrix.rows().into_iter().map(|row| [row[0], row[1]]).collect()
        };

        Self {
            task,
            task_id: task_id.into(),
            batch_size,
            steps: steps
                .iter()
                .map(|step| StepSummary {
                    input_shape: step.inputs.shape().to_vec(),
                    previous_labels: rows(&step.previous_labels),
                    labels: rows(&step.labels),
                })
                .collect(),
        }
    }
}

impl fmt::Display for EpisodeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Episode for task {} ({}): {} step(s), batch size {}",
            self.task,
            self.task_id,
            self.steps.len(),
            self.batch_size
        )?;

        for (idx, step) in self.steps.iter().enumerate() {
            writeln!(f, "  step {idx}: input {:?}", step.input_shape)?;
            for (previous, label) in step.previous_labels.iter().zip(&step.labels) {
                writeln!(
                    f,
                    "    previous ({:.4}, {:.4}) -> label ({:.4}, {:.4})",
                    previous[0], previous[1], label[0], label[1]
                )?;
            }
        }

        Ok(())
    }
}
