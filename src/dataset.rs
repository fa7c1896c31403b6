//! The gaze dataset: parsed records, task index, loader and transform.

use rand::Rng;
use tracing::info;

use crate::annotation::{read_annotation_dir, AnnotationRecord};
use crate::config::DatasetConfig;
use crate::error::GazeError;
use crate::index::DatasetIndex;
use crate::loader::{ImageDecoder, LoaderOptions, PngDecoder, Sample, SampleLoader};
use crate::transform::{TensorPipeline, TensorSample, Transform};

/// An indexed, randomly accessible gaze dataset.
///
/// Everything except the `testing` flag is fixed at construction. Toggling
/// the flag changes how [`GazeDataset::get`] maps indices; callers sharing a
/// dataset across threads must serialise that toggle themselves.
#[derive(Clone, Debug)]
pub struct GazeDataset<T = TensorPipeline, D = PngDecoder> {
    config: DatasetConfig,
    records: Vec<AnnotationRecord>,
    index: DatasetIndex,
    loader: SampleLoader<D>,
    transform: T,
    testing: bool,
}

impl<T: Transform> GazeDataset<T, PngDecoder> {
    /// Parse `config.annotation_dir` and build the dataset.
    pub fn open(config: DatasetConfig, transform: T) -> Result<Self, GazeError> {
        let records = read_annotation_dir(&config.annotation_dir)?;
        Self::from_records(config, records, transform)
    }

    /// Build the dataset from already parsed records.
    pub fn from_records(
        config: DatasetConfig,
        records: Vec<AnnotationRecord>,
        transform: T,
    ) -> Result<Self, GazeError> {
        Self::with_decoder(config, records, transform, PngDecoder)
    }
}

impl<T: Transform, D: ImageDecoder> GazeDataset<T, D> {
    /// Build the dataset with a custom image decoder.
    pub fn with_decoder(
        config: DatasetConfig,
        records: Vec<AnnotationRecord>,
        transform: T,
        decoder: D,
    ) -> Result<Self, GazeError> {
        config.validate()?;

        let index = DatasetIndex::build(&records, config.reserved_test_tasks)?;
        for group in index.tasks() {
            info!(task = %group.task_id, samples = group.len(), "indexed task");
        }
        info!(
            test_size = index.test_len(),
            train_size = index.train_len(),
            "reserved test partition"
        );

        let loader =
            SampleLoader::with_decoder(&config.image_dir, LoaderOptions::from(&config), decoder);

        Ok(Self {
            config,
            records,
            index,
            loader,
            transform,
            testing: false,
        })
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    pub fn records(&self) -> &[AnnotationRecord] {
        &self.records
    }

    pub fn index(&self) -> &DatasetIndex {
        &self.index
    }

    pub fn loader(&self) -> &SampleLoader<D> {
        &self.loader
    }

    pub fn is_testing(&self) -> bool {
        self.testing
    }

    /// Switch index remapping between the train and test partitions.
    pub fn set_testing(&mut self, testing: bool) {
        self.testing = testing;
    }

    /// Length of the active partition.
    pub fn len(&self) -> usize {
        let split = self.index.split();
        if self.testing {
            split.test_len
        } else {
            split.effective_train_len(self.config.empty_train_fallback)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Global record index that `index` refers to in the active mode.
    pub fn resolve(&self, index: usize) -> Result<usize, GazeError> {
        if self.testing {
            self.index.split().remap_test(index)
        } else {
            Ok(index)
        }
    }

    /// Load the sample at `index` without running the transform.
    pub fn sample<R: Rng + ?Sized>(&self, index: usize, rng: &mut R) -> Result<Sample, GazeError> {
        let index = self.resolve(index)?;
        self.loader.load(&self.records, index, rng)
    }

    /// Load and transform the sample at `index`.
    pub fn get<R: Rng + ?Sized>(
        &self,
        index: usize,
        rng: &mut R,
    ) -> Result<TensorSample, GazeError> {
        let sample = self.sample(index, rng)?;
        self.transform.apply(sample, rng)
    }

    /// Load and transform a record by global index, ignoring the testing flag.
    pub fn get_record<R: Rng + ?Sized>(
        &self,
        index: usize,
        rng: &mut R,
    ) -> Result<TensorSample, GazeError> {
        let sample = self.loader.load(&self.records, index, rng)?;
        self.transform.apply(sample, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::PartialPoint;

    fn records(tasks: &[&str]) -> Vec<AnnotationRecord> {
        tasks
            .iter()
            .enumerate()
            .map(|(idx, task)| {
                let mut record = AnnotationRecord::new(format!("img_{idx}"));
                record.task_id = Some(task.to_string());
                record.gaze = Some(PartialPoint {
                    x: Some(idx as f64),
                    y: Some(0.0),
                });
                record
            })
            .collect()
    }

    fn dataset(tasks: &[&str], reserved: usize) -> GazeDataset {
        let mut config = DatasetConfig::new("imgs", "anns");
        config.reserved_test_tasks = reserved;
        GazeDataset::from_records(config, records(tasks), TensorPipeline::plain())
            .expect("build dataset")
    }

    #[test]
    fn resolve_follows_the_testing_flag() {
        let mut dataset = dataset(&["a", "a", "b", "c", "c"], 2);
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.resolve(4).expect("train index"), 4);

        dataset.set_testing(true);
        assert!(dataset.is_testing());
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.resolve(0).expect("test index"), 2);
        assert_eq!(dataset.resolve(4).expect("wrapped index"), 3);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = DatasetConfig::new("imgs", "anns");
        config.width = 0;
        assert!(matches!(
            GazeDataset::from_records(config, records(&["a"]), TensorPipeline::plain()),
            Err(GazeError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn records_without_task_are_rejected() {
        let mut records = records(&["a", "b"]);
        records[1].task_id = None;
        assert!(matches!(
            GazeDataset::from_records(
                DatasetConfig::new("imgs", "anns"),
                records,
                TensorPipeline::plain()
            ),
            Err(GazeError::MissingField { .. })
        ));
    }
}
