//! Few-shot episode construction.
//!
//! Episodes are drawn from one task at a time. Sample pairs address records
//! by their global index, so episodes are unaffected by the dataset's
//! `testing` flag.

mod report;

pub use report::{EpisodeSummary, StepSummary};

use ndarray::{Array2, Array3, Array4, Axis};
use rand::seq::SliceRandom;
use rand::{Rng, RngExt};
use serde::Serialize;

use crate::dataset::GazeDataset;
use crate::error::GazeError;
use crate::loader::ImageDecoder;
use crate::transform::{TensorSample, Transform};

/// One drawn sample of a few-shot task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct TaskSample {
    /// Task position.
    pub task: usize,
    /// Global record index.
    pub sample: usize,
}

/// One step of a label-shifted sequence.
#[derive(Clone, Debug, PartialEq)]
pub struct EpisodeStep {
    /// `C x H x W` input of the current sample.
    pub input: Array3<f32>,
    /// Label of the previous step (the last sample's label for step 0).
    pub previous_label: [f64; 2],
    pub label: [f64; 2],
}

/// One batch position of a batched sequence.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchedStep {
    /// `B x C x H x W` inputs.
    pub inputs: Array4<f32>,
    /// `B x 2` labels carried from the same lane of the previous position.
    pub previous_labels: Array2<f64>,
    /// `B x 2` labels of this position.
    pub labels: Array2<f64>,
}

impl BatchedStep {
    pub fn batch_size(&self) -> usize {
        self.inputs.len_of(Axis(0))
    }
}

/// Draws few-shot tasks and sequences from a dataset.
#[derive(Debug)]
pub struct EpisodeGenerator<'a, T, D> {
    dataset: &'a GazeDataset<T, D>,
}

impl<'a, T: Transform, D: ImageDecoder> EpisodeGenerator<'a, T, D> {
    pub fn new(dataset: &'a GazeDataset<T, D>) -> Self {
        Self { dataset }
    }

    /// Draw `min(n, sample_count(task))` distinct samples of `task`.
    ///
    /// The task's records are shuffled before the subset is taken, and the
    /// subset is shuffled again before it is returned.
    pub fn few_shot_task<R: Rng + ?Sized>(
        &self,
        task: usize,
        n: usize,
        rng: &mut R,
    ) -> Result<(Vec<TaskSample>, usize), GazeError> {
        let group = self.dataset.index().task(task)?;
        let count = n.min(group.len());

        let mut indices = group.indices.clone();
        indices.shuffle(rng);

        let mut pairs: Vec<TaskSample> = indices
            .into_iter()
            .take(count)
            .map(|sample| TaskSample { task, sample })
            .collect();
        pairs.shuffle(rng);

        Ok((pairs, count))
    }

    /// Build a label-shifted sequence over a few-shot draw of `task`.
    ///
    /// Step `i` holds sample `i`'s input and label, and sample `i - 1`'s
    /// label as previous label. Step 0 wraps around to the last sample.
    pub fn sequential_episode<R: Rng + ?Sized>(
        &self,
        task: usize,
        n: usize,
        rng: &mut R,
    ) -> Result<(Vec<EpisodeStep>, usize), GazeError> {
        let (pairs, count) = self.few_shot_task(task, n, rng)?;
        let samples = self.load_all(&pairs, rng)?;

        let Some(last) = samples.last() else {
            return Ok((Vec::new(), 0));
        };
        let mut previous = last.label;

        let steps = samples
            .into_iter()
            .map(|sample| {
                let step = EpisodeStep {
                    input: sample.image,
                    previous_label: previous,
                    label: sample.label,
                };
                previous = sample.label;
                step
            })
            .collect();

        Ok((steps, count))
    }

    /// Build `n / batch_size` batch positions over a few-shot draw of `task`.
    ///
    /// Lane `j` of position `i` carries the label produced in lane `j` of
    /// position `i - 1`; every lane of position 0 starts from the label of
    /// the last drawn sample.
    pub fn batched_episode<R: Rng + ?Sized>(
        &self,
        task: usize,
        n: usize,
        batch_size: usize,
        rng: &mut R,
    ) -> Result<(Vec<BatchedStep>, usize), GazeError> {
        if batch_size == 0 {
            return Err(GazeError::InvalidBatchSize);
        }

        let (pairs, count) = self.few_shot_task(task, n, rng)?;
        let batch_count = n / batch_size;
        let needed = batch_count * batch_size;
        if needed > count {
            return Err(GazeError::InsufficientSamples {
                requested: needed,
                available: count,
            });
        }

        let Some(last) = pairs.last().filter(|_| batch_count > 0) else {
            return Ok((Vec::new(), 0));
        };
        let seed = self.dataset.get_record(last.sample, rng)?.label;
        let mut carry = vec![seed; batch_size];

        let mut steps = Vec::with_capacity(batch_count);
        for chunk in pairs[..needed].chunks(batch_size) {
            let samples = self.load_all(chunk, rng)?;

            let views: Vec<_> = samples.iter().map(|sample| sample.image.view()).collect();
            let inputs = ndarray::stack(Axis(0), &views)?;

            let labels: Vec<[f64; 2]> = samples.iter().map(|sample| sample.label).collect();
            let previous_labels = label_matrix(&carry)?;
            let current_labels = label_matrix(&labels)?;
            carry = labels;

            steps.push(BatchedStep {
                inputs,
                previous_labels,
                labels: current_labels,
            });
        }

        Ok((steps, batch_count))
    }

    /// Load the `sample`-th record of `task` (task-relative addressing).
    pub fn sample<R: Rng + ?Sized>(
        &self,
        task: usize,
        sample: usize,
        rng: &mut R,
    ) -> Result<TensorSample, GazeError> {
        let group = self.dataset.index().task(task)?;
        let index = *group
            .indices
            .get(sample)
            .ok_or(GazeError::SampleOutOfRange {
                index: sample,
                len: group.len(),
            })?;
        self.dataset.get_record(index, rng)
    }

    /// Label of a uniformly drawn sample of the active partition.
    pub fn random_label<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<[f64; 2], GazeError> {
        let len = self.dataset.len();
        if len == 0 {
            return Err(GazeError::SampleOutOfRange { index: 0, len });
        }
        let index = rng.random_range(0..len);
        Ok(self.dataset.get(index, rng)?.label)
    }

    fn load_all<R: Rng + ?Sized>(
        &self,
        pairs: &[TaskSample],
        rng: &mut R,
    ) -> Result<Vec<TensorSample>, GazeError> {
        pairs
            .iter()
            .map(|pair| self.dataset.get_record(pair.sample, rng))
            .collect()
    }
}

fn label_matrix(labels: &[[f64; 2]]) -> Result<Array2<f64>, GazeError> {
    let flat: Vec<f64> = labels.iter().flatten().copied().collect();
    Ok(Array2::from_shape_vec((labels.len(), 2), flat)?)
}
