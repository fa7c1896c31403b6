//! Pre-flight validation of annotation records.
//!
//! This module checks the input contract that sample loading relies on:
//! - Field completeness (task id, gaze, camera offset)
//! - Image availability and declared dimensions
//! - Region presence and ordering when stacking is enabled

mod report;

pub use report::{IssueCode, IssueContext, Severity, ValidationIssue, ValidationReport};

use std::path::Path;

use crate::annotation::{AnnotationRecord, REGION_FACE, REGION_LEFT_EYE, REGION_RIGHT_EYE};
use crate::config::{DatasetConfig, StackAnchor};
use crate::index::DatasetIndex;
use crate::loader::image_path;

/// Options for validation behavior.
#[derive(Clone, Debug, Default)]
pub struct ValidateOptions {
    /// If true, treat warnings as errors.
    pub strict: bool,
    /// Regions every record must provide.
    pub required_regions: Vec<String>,
    /// Trailing task groups reserved for testing.
    pub reserved_test_tasks: usize,
}

impl ValidateOptions {
    /// Options matching what a dataset built from `config` will need.
    pub fn for_config(config: &DatasetConfig) -> Self {
        let mut required_regions = Vec::new();
        if config.stacking {
            if config.stack_anchor == StackAnchor::Face {
                required_regions.push(REGION_FACE.to_string());
            }
            required_regions.push(REGION_RIGHT_EYE.to_string());
            required_regions.push(REGION_LEFT_EYE.to_string());
        }

        Self {
            strict: false,
            required_regions,
            reserved_test_tasks: config.reserved_test_tasks,
        }
    }
}

/// Validates records against their image directory and returns a report of
/// all issues found.
pub fn validate_records(
    records: &[AnnotationRecord],
    image_dir: &Path,
    opts: &ValidateOptions,
) -> ValidationReport {
    let mut report = ValidationReport::new();

    if records.is_empty() {
        report.add(ValidationIssue::error(
            IssueCode::EmptyDataset,
            "No annotation records found",
            IssueContext::Dataset,
        ));
        return report;
    }

    for (index, record) in records.iter().enumerate() {
        let context = IssueContext::Record {
            index,
            filename: record.filename.clone(),
        };
        validate_fields(record, &context, &mut report);
        validate_image(record, image_dir, &context, &mut report);
        validate_regions(record, opts, &context, &mut report);
    }

    validate_split(records, opts, &mut report);

    report
}

fn validate_fields(
    record: &AnnotationRecord,
    context: &IssueContext,
    report: &mut ValidationReport,
) {
    if record.filename.is_empty() {
        report.add(ValidationIssue::warning(
            IssueCode::EmptyFileName,
            "Empty filename",
            context.clone(),
        ));
    }

    if let Err(err) = record.task_id() {
        report.add(ValidationIssue::error(
            IssueCode::MissingTaskId,
            err.to_string(),
            context.clone(),
        ));
    }

    if let Err(err) = record.gaze() {
        report.add(ValidationIssue::error(
            IssueCode::MissingGaze,
            err.to_string(),
            context.clone(),
        ));
    }

    if let Err(err) = record.camera_screen_offset() {
        report.add(ValidationIssue::error(
            IssueCode::MissingCameraOffset,
            err.to_string(),
            context.clone(),
        ));
    }
}

/// Checks the image file through its header only; pixels are not decoded.
fn validate_image(
    record: &AnnotationRecord,
    image_dir: &Path,
    context: &IssueContext,
    report: &mut ValidationReport,
) {
    let path = image_path(image_dir, &record.filename);
    if !path.is_file() {
        report.add(ValidationIssue::error(
            IssueCode::MissingImageFile,
            format!("Image file {} not found", path.display()),
            context.clone(),
        ));
        return;
    }

    let size = match imagesize::size(&path) {
        Ok(size) => size,
        Err(err) => {
            report.add(ValidationIssue::warning(
                IssueCode::UnreadableImage,
                format!("Cannot read image header of {}: {}", path.display(), err),
                context.clone(),
            ));
            return;
        }
    };

    let declared = (record.width, record.height);
    if let (Some(width), Some(height)) = declared {
        if size.width != width as usize || size.height != height as usize {
            report.add(ValidationIssue::warning(
                IssueCode::ImageSizeMismatch,
                format!(
                    "Declared size {}x{} differs from image size {}x{}",
                    width, height, size.width, size.height
                ),
                context.clone(),
            ));
        }
    }
}

fn validate_regions(
    record: &AnnotationRecord,
    opts: &ValidateOptions,
    context: &IssueContext,
    report: &mut ValidationReport,
) {
    for name in &opts.required_regions {
        if !record.regions.contains_key(name) {
            report.add(ValidationIssue::error(
                IssueCode::MissingRegion,
                format!("Missing '{}' region required for stacking", name),
                context.clone(),
            ));
        }
    }

    for (name, region) in &record.regions {
        if !region.is_ordered() {
            report.add(ValidationIssue::warning(
                IssueCode::InvalidRegionOrdering,
                format!(
                    "Region '{}' has min > max ([{}, {}, {}, {}])",
                    name, region.xmin, region.ymin, region.xmax, region.ymax
                ),
                context.clone(),
            ));
        }
    }
}

/// Skipped when task ids are missing; those are already reported per record.
fn validate_split(
    records: &[AnnotationRecord],
    opts: &ValidateOptions,
    report: &mut ValidationReport,
) {
    let Ok(index) = DatasetIndex::build(records, opts.reserved_test_tasks) else {
        return;
    };

    if index.train_len() == 0 {
        report.add(ValidationIssue::warning(
            IssueCode::EmptyTrainPartition,
            format!(
                "Reserving {} of {} task(s) leaves no training sample",
                index.split().reserved_tasks,
                index.task_count()
            ),
            IssueContext::Dataset,
        ));
    }
}
