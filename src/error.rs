use std::path::PathBuf;
use thiserror::Error;

use crate::validation::ValidationReport;

/// The main error type for gazeshot operations.
#[derive(Debug, Error)]
pub enum GazeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse annotation {path}: {message}")]
    AnnotationParse { path: PathBuf, message: String },

    #[error("Annotation '{filename}' has no <{field}> field")]
    MissingField { filename: String, field: String },

    #[error("Task index {index} is out of range ({count} task(s) available)")]
    TaskOutOfRange { index: usize, count: usize },

    #[error("Sample index {index} is out of range (length {len})")]
    SampleOutOfRange { index: usize, len: usize },

    #[error("Testing mode requires a non-empty test partition")]
    EmptyTestPartition,

    #[error("No decodable image found starting at index {index} after {attempts} attempt(s)")]
    ImageUnavailable { index: usize, attempts: usize },

    #[error("Failed to decode image {path}: {source}")]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Region '{region}' of '{filename}' is empty after clamping ({width}x{height})")]
    DegenerateRegion {
        filename: String,
        region: String,
        width: u32,
        height: u32,
    },

    #[error("Requested {requested} sample(s) but only {available} are available")]
    InsufficientSamples { requested: usize, available: usize },

    #[error("Batch size must be greater than 0")]
    InvalidBatchSize,

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid config: {message}")]
    InvalidConfig { message: String },

    #[error("Failed to write report: {0}")]
    ReportWrite(#[from] serde_json::Error),

    #[error("Validation failed with {error_count} error(s) and {warning_count} warning(s)")]
    ValidationFailed {
        error_count: usize,
        warning_count: usize,
        report: ValidationReport,
    },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl GazeError {
    pub(crate) fn missing(filename: &str, field: &str) -> Self {
        GazeError::MissingField {
            filename: filename.to_string(),
            field: field.to_string(),
        }
    }
}
