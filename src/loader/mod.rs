//! Per-index sample assembly.
//!
//! [`SampleLoader::load`] turns a record index into a [`Sample`]: it decodes
//! `<image_dir>/<filename>.png` (probing forward past undecodable files),
//! randomises the flat background, optionally stacks the anchor image with
//! both eye crops, and attaches the gaze label.

pub mod background;
pub mod regions;

use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::{Array3, Axis};
use rand::Rng;
use tracing::warn;

use crate::annotation::{
    AnnotationRecord, GazePoint, REGION_FACE, REGION_LEFT_EYE, REGION_RIGHT_EYE,
};
use crate::config::{DatasetConfig, StackAnchor};
use crate::error::GazeError;

pub use background::randomize_background;
pub use regions::{crop_region, random_pad_crop, CropRect};

const IMAGE_EXTENSION: &str = "png";

/// Image file for the annotation `filename` under `image_dir`.
pub fn image_path(image_dir: &Path, filename: &str) -> PathBuf {
    image_dir.join(format!("{filename}.{IMAGE_EXTENSION}"))
}

/// Channel depth of a decoded image.
pub const BASE_CHANNELS: usize = 3;

/// Decodes image files into RGB buffers.
pub trait ImageDecoder {
    fn decode(&self, path: &Path) -> Result<RgbImage, GazeError>;
}

/// Decoder backed by the `image` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct PngDecoder;

impl ImageDecoder for PngDecoder {
    fn decode(&self, path: &Path) -> Result<RgbImage, GazeError> {
        let image = image::open(path).map_err(|source| GazeError::ImageDecode {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(image.to_rgb8())
    }
}

/// A loaded sample before the transform pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    /// `H x W x C` pixels; `C` is 3, or 9 when stacked.
    pub image: Array3<u8>,
    pub label: GazePoint,
    /// Record the sample was actually read from (after forward probing).
    pub index: usize,
}

/// Geometry and augmentation options of a [`SampleLoader`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoaderOptions {
    pub width: u32,
    pub height: u32,
    pub stacking: bool,
    pub region_divisor: f64,
    pub random_crop: bool,
    pub max_crop_padding: u32,
    pub stack_anchor: StackAnchor,
}

impl From<&DatasetConfig> for LoaderOptions {
    fn from(config: &DatasetConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            stacking: config.stacking,
            region_divisor: config.region_divisor(),
            random_crop: config.random_crop,
            max_crop_padding: config.max_crop_padding,
            stack_anchor: config.stack_anchor,
        }
    }
}

/// Loads samples from an image directory.
#[derive(Clone, Debug)]
pub struct SampleLoader<D = PngDecoder> {
    image_dir: PathBuf,
    options: LoaderOptions,
    decoder: D,
}

impl SampleLoader<PngDecoder> {
    pub fn new(image_dir: impl Into<PathBuf>, options: LoaderOptions) -> Self {
        Self::with_decoder(image_dir, options, PngDecoder)
    }
}

impl<D: ImageDecoder> SampleLoader<D> {
    pub fn with_decoder(image_dir: impl Into<PathBuf>, options: LoaderOptions, decoder: D) -> Self {
        Self {
            image_dir: image_dir.into(),
            options,
            decoder,
        }
    }

    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    /// Path of the image backing `record`.
    pub fn image_path(&self, record: &AnnotationRecord) -> PathBuf {
        image_path(&self.image_dir, &record.filename)
    }

    /// Load the sample at global record index `index`.
    pub fn load<R: Rng + ?Sized>(
        &self,
        records: &[AnnotationRecord],
        index: usize,
        rng: &mut R,
    ) -> Result<Sample, GazeError> {
        if index >= records.len() {
            return Err(GazeError::SampleOutOfRange {
                index,
                len: records.len(),
            });
        }

        let (index, mut image) = self.acquire(records, index)?;
        randomize_background(&mut image, rng);

        let record = &records[index];
        let image = if self.options.stacking {
            self.stack_regions(record, &image, rng)?
        } else {
            to_array(self.resize(&image))?
        };

        Ok(Sample {
            image,
            label: record.label()?,
            index,
        })
    }

    /// Decode the first readable image at or after `start`.
    ///
    /// Probes at most `records.len() - start` indices and never runs past
    /// the last record.
    fn acquire(
        &self,
        records: &[AnnotationRecord],
        start: usize,
    ) -> Result<(usize, RgbImage), GazeError> {
        let mut attempts = 0;

        for (index, record) in records.iter().enumerate().skip(start) {
            attempts += 1;
            let path = self.image_path(record);
            match self.decoder.decode(&path) {
                Ok(image) => return Ok((index, image)),
                Err(error) => {
                    warn!(
                        index,
                        path = %path.display(),
                        %error,
                        "image decode failed, probing next index"
                    );
                }
            }
        }

        Err(GazeError::ImageUnavailable {
            index: start,
            attempts,
        })
    }

    fn stack_regions<R: Rng + ?Sized>(
        &self,
        record: &AnnotationRecord,
        image: &RgbImage,
        rng: &mut R,
    ) -> Result<Array3<u8>, GazeError> {
        let divisor = self.options.region_divisor;
        let (width, height) = image.dimensions();

        let anchor = match self.options.stack_anchor {
            StackAnchor::FullImage => self.resize(image),
            StackAnchor::Face => self.resize(&crop_region(image, record, REGION_FACE, divisor)?),
        };

        let mut planes = vec![to_array(anchor)?];
        for name in [REGION_RIGHT_EYE, REGION_LEFT_EYE] {
            let mut eye = crop_region(image, record, name, divisor)?;
            if self.options.random_crop {
                eye = random_pad_crop(&eye, width, height, self.options.max_crop_padding, rng);
            }
            planes.push(to_array(self.resize(&eye))?);
        }

        let views: Vec<_> = planes.iter().map(|plane| plane.view()).collect();
        Ok(ndarray::concatenate(Axis(2), &views)?)
    }

    fn resize(&self, image: &RgbImage) -> RgbImage {
        imageops::resize(
            image,
            self.options.width,
            self.options.height,
            FilterType::Triangle,
        )
    }
}

fn to_array(image: RgbImage) -> Result<Array3<u8>, GazeError> {
    let (width, height) = image.dimensions();
    Ok(Array3::from_shape_vec(
        (height as usize, width as usize, BASE_CHANNELS),
        image.into_raw(),
    )?)
}
