//! Region crops and eye-crop augmentation.

use image::imageops::{self, FilterType};
use image::RgbImage;
use rand::{Rng, RngExt};

use crate::annotation::{AnnotationRecord, RegionBox};
use crate::error::GazeError;

/// A clamped, integer crop rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    /// Scale `region` by `1 / divisor` and clamp it into a `width` x `height` image.
    ///
    /// Coordinates are truncated toward zero after clamping; a box whose max
    /// is below its min yields an empty rectangle.
    pub fn clamp(region: RegionBox, divisor: f64, width: u32, height: u32) -> Self {
        let clamp = |value: f64, bound: u32| (value / divisor).max(0.0).min(bound as f64) as u32;

        let x1 = clamp(region.xmin, width);
        let y1 = clamp(region.ymin, height);
        let x2 = clamp(region.xmax, width);
        let y2 = clamp(region.ymax, height);

        CropRect {
            x: x1,
            y: y1,
            width: x2.saturating_sub(x1),
            height: y2.saturating_sub(y1),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Crop the named region of `record` out of `image`.
pub fn crop_region(
    image: &RgbImage,
    record: &AnnotationRecord,
    name: &str,
    divisor: f64,
) -> Result<RgbImage, GazeError> {
    let rect = CropRect::clamp(
        record.region(name)?,
        divisor,
        image.width(),
        image.height(),
    );

    if rect.is_empty() {
        return Err(GazeError::DegenerateRegion {
            filename: record.filename.clone(),
            region: name.to_string(),
            width: rect.width,
            height: rect.height,
        });
    }

    Ok(imageops::crop_imm(image, rect.x, rect.y, rect.width, rect.height).to_image())
}

/// Resize `crop` to `(width + off, height + off)` with `off` drawn from
/// `[1, max_padding]`, then cut a `width` x `height` window at a random
/// top-left corner.
pub fn random_pad_crop<R: Rng + ?Sized>(
    crop: &RgbImage,
    width: u32,
    height: u32,
    max_padding: u32,
    rng: &mut R,
) -> RgbImage {
    let off = rng.random_range(1..=max_padding.max(1));
    let padded = imageops::resize(crop, width + off, height + off, FilterType::Triangle);

    let top = rng.random_range(0..off);
    let left = rng.random_range(0..off);
    imageops::crop_imm(&padded, left, top, width, height).to_image()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn clamp_truncates_and_bounds() {
        let rect = CropRect::clamp(RegionBox::new(-5.0, 2.7, 30.9, 500.0), 1.0, 20, 10);
        assert_eq!(
            rect,
            CropRect {
                x: 0,
                y: 2,
                width: 20,
                height: 8
            }
        );
    }

    #[test]
    fn clamp_applies_divisor_before_bounds() {
        let rect = CropRect::clamp(RegionBox::new(10.0, 10.0, 30.0, 50.0), 2.0, 100, 100);
        assert_eq!(
            rect,
            CropRect {
                x: 5,
                y: 5,
                width: 10,
                height: 20
            }
        );
    }

    #[test]
    fn inverted_box_is_degenerate() {
        let image = RgbImage::from_pixel(10, 10, Rgb([1, 2, 3]));
        let mut record = AnnotationRecord::new("img");
        record
            .regions
            .insert("reye".to_string(), RegionBox::new(8.0, 8.0, 2.0, 2.0));

        assert!(matches!(
            crop_region(&image, &record, "reye", 1.0),
            Err(GazeError::DegenerateRegion { .. })
        ));
        assert!(matches!(
            crop_region(&image, &record, "leye", 1.0),
            Err(GazeError::MissingField { .. })
        ));
    }

    #[test]
    fn crop_region_copies_pixels() {
        let mut image = RgbImage::from_pixel(10, 10, Rgb([0, 0, 0]));
        image.put_pixel(3, 4, Rgb([9, 9, 9]));
        let mut record = AnnotationRecord::new("img");
        record
            .regions
            .insert("face".to_string(), RegionBox::new(3.0, 4.0, 6.0, 8.0));

        let crop = crop_region(&image, &record, "face", 1.0).expect("crop");
        assert_eq!(crop.dimensions(), (3, 4));
        assert_eq!(*crop.get_pixel(0, 0), Rgb([9, 9, 9]));
    }

    #[test]
    fn pad_crop_keeps_requested_size() {
        let crop = RgbImage::from_pixel(7, 5, Rgb([40, 50, 60]));
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..8 {
            let out = random_pad_crop(&crop, 32, 24, 64, &mut rng);
            assert_eq!(out.dimensions(), (32, 24));
        }
    }
}
