//! Dataset construction options.
//!
//! A [`DatasetConfig`] can be built in code or read from YAML:
//!
//! ```yaml
//! image_dir: data/images
//! annotation_dir: data/annotations
//! width: 128
//! height: 128
//! stacking: true
//! reserved_test_tasks: 2
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::GazeError;

const DEFAULT_SIZE: u32 = 224;
const DEFAULT_MAX_CROP_PADDING: u32 = 64;

/// Which image fills the first plane of a stacked sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum StackAnchor {
    /// The whole background-randomised image.
    #[default]
    FullImage,
    /// The `face` region crop.
    Face,
}

/// Options recognised when building a dataset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetConfig {
    /// Directory holding `<filename>.png` images.
    pub image_dir: PathBuf,

    /// Directory holding one annotation XML file per image.
    pub annotation_dir: PathBuf,

    /// Output width in pixels.
    #[serde(default = "default_size")]
    pub width: u32,

    /// Output height in pixels.
    #[serde(default = "default_size")]
    pub height: u32,

    /// Stack the anchor image with both eye crops along the channel axis.
    #[serde(default)]
    pub stacking: bool,

    /// Divide region coordinates by two before cropping.
    #[serde(default)]
    pub halve_regions: bool,

    /// Pad-and-crop augmentation on eye regions.
    #[serde(default = "default_true")]
    pub random_crop: bool,

    /// Upper bound of the random pad offset.
    #[serde(default = "default_max_crop_padding")]
    pub max_crop_padding: u32,

    #[serde(default)]
    pub stack_anchor: StackAnchor,

    /// Number of trailing task groups reserved for testing.
    #[serde(default = "default_reserved_test_tasks")]
    pub reserved_test_tasks: usize,

    /// When no training sample remains, report the test size as train length.
    #[serde(default = "default_true")]
    pub empty_train_fallback: bool,
}

fn default_size() -> u32 {
    DEFAULT_SIZE
}

fn default_true() -> bool {
    true
}

fn default_max_crop_padding() -> u32 {
    DEFAULT_MAX_CROP_PADDING
}

fn default_reserved_test_tasks() -> usize {
    1
}

impl DatasetConfig {
    /// Creates a config with default options for the given directories.
    pub fn new(image_dir: impl Into<PathBuf>, annotation_dir: impl Into<PathBuf>) -> Self {
        Self {
            image_dir: image_dir.into(),
            annotation_dir: annotation_dir.into(),
            width: DEFAULT_SIZE,
            height: DEFAULT_SIZE,
            stacking: false,
            halve_regions: false,
            random_crop: true,
            max_crop_padding: DEFAULT_MAX_CROP_PADDING,
            stack_anchor: StackAnchor::default(),
            reserved_test_tasks: 1,
            empty_train_fallback: true,
        }
    }

    /// Read a config from a YAML file.
    ///
    /// Relative directories are kept as written (resolved against the
    /// process working directory, not the config file).
    pub fn from_yaml_file(path: &Path) -> Result<Self, GazeError> {
        let raw = fs::read_to_string(path).map_err(GazeError::Io)?;
        Self::from_yaml_str(&raw, path)
    }

    pub fn from_yaml_str(raw: &str, path: &Path) -> Result<Self, GazeError> {
        let config: DatasetConfig =
            serde_yaml::from_str(raw).map_err(|source| GazeError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Check option ranges.
    pub fn validate(&self) -> Result<(), GazeError> {
        if self.width == 0 || self.height == 0 {
            return Err(GazeError::InvalidConfig {
                message: format!(
                    "output size must be positive, got {}x{}",
                    self.width, self.height
                ),
            });
        }

        if self.random_crop && self.max_crop_padding == 0 {
            return Err(GazeError::InvalidConfig {
                message: "max_crop_padding must be at least 1 when random_crop is enabled"
                    .to_string(),
            });
        }

        Ok(())
    }

    /// Divisor applied to region coordinates.
    pub fn region_divisor(&self) -> f64 {
        if self.halve_regions {
            2.0
        } else {
            1.0
        }
    }
}
