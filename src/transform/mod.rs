//! Transform pipeline applied to loaded samples.
//!
//! A [`Transform`] turns a [`Sample`] (`H x W x C` bytes plus a gaze label)
//! into the representation handed to the consumer. The built-in
//! [`TensorPipeline`] packs the label into an `[x, y]` pair, moves channels
//! first and scales pixels into `[0, 1]`, optionally after a random
//! per-channel recolour.

use ndarray::{Array3, Axis};
use rand::{Rng, RngExt};

use crate::error::GazeError;
use crate::loader::{Sample, BASE_CHANNELS};

/// A model-ready sample.
#[derive(Clone, Debug, PartialEq)]
pub struct TensorSample {
    /// `C x H x W` values.
    pub image: Array3<f32>,
    /// `[x, y]` gaze label.
    pub label: [f64; 2],
    /// Record the sample was read from.
    pub index: usize,
}

/// Converts a loaded sample into its consumer-facing form.
pub trait Transform {
    fn apply<R: Rng + ?Sized>(&self, sample: Sample, rng: &mut R)
        -> Result<TensorSample, GazeError>;
}

/// Label packing, channel-first layout and pixel scaling.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TensorPipeline {
    recolor: bool,
    scale: f32,
}

impl TensorPipeline {
    /// Pack and normalise without augmentation.
    pub fn plain() -> Self {
        Self {
            recolor: false,
            scale: 255.0,
        }
    }

    /// Multiply each colour channel by `1 + t`, `t ~ U[0, 1)`, before scaling.
    ///
    /// One gain per base colour channel is drawn per sample and shared by
    /// every stacked plane. Scaled values can exceed 1.0.
    pub fn with_recolor() -> Self {
        Self {
            recolor: true,
            ..Self::plain()
        }
    }

    pub fn recolors(&self) -> bool {
        self.recolor
    }
}

impl Default for TensorPipeline {
    fn default() -> Self {
        Self::plain()
    }
}

impl Transform for TensorPipeline {
    fn apply<R: Rng + ?Sized>(
        &self,
        sample: Sample,
        rng: &mut R,
    ) -> Result<TensorSample, GazeError> {
        let Sample {
            image,
            label,
            index,
        } = sample;

        let mut values = image.mapv(f32::from);

        if self.recolor {
            let gains: [f32; BASE_CHANNELS] =
                std::array::from_fn(|_| 1.0 + rng.random::<f32>());
            for (channel, mut plane) in values.axis_iter_mut(Axis(2)).enumerate() {
                plane *= gains[channel % BASE_CHANNELS];
            }
        }

        let scale = self.scale;
        values.mapv_inplace(|value| value / scale);

        let image = values
            .permuted_axes([2, 0, 1])
            .as_standard_layout()
            .into_owned();

        Ok(TensorSample {
            image,
            label: label.to_array(),
            index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::GazePoint;
    use rand::{rngs::StdRng, SeedableRng};

    fn sample() -> Sample {
        let mut image = Array3::<u8>::zeros((2, 3, 3));
        image[[0, 1, 0]] = 255;
        image[[1, 2, 2]] = 51;
        Sample {
            image,
            label: GazePoint::new(0.25, -0.75),
            index: 4,
        }
    }

    #[test]
    fn plain_moves_channels_first_and_scales() {
        let out = TensorPipeline::plain()
            .apply(sample(), &mut StdRng::seed_from_u64(0))
            .expect("apply");

        assert_eq!(out.image.dim(), (3, 2, 3));
        assert_eq!(out.image[[0, 0, 1]], 1.0);
        assert_eq!(out.image[[2, 1, 2]], 0.2);
        assert_eq!(out.label, [0.25, -0.75]);
        assert_eq!(out.index, 4);
    }

    #[test]
    fn recolor_scales_channels_within_bounds() {
        let out = TensorPipeline::with_recolor()
            .apply(sample(), &mut StdRng::seed_from_u64(9))
            .expect("apply");

        let boosted = out.image[[0, 0, 1]];
        assert!((1.0..2.0).contains(&boosted), "got {boosted}");
        assert_eq!(out.image[[1, 0, 0]], 0.0);
    }

    #[test]
    fn recolor_shares_gains_across_stacked_planes() {
        let image = Array3::<u8>::from_elem((1, 1, 3 * BASE_CHANNELS), 100);
        let stacked = Sample {
            image,
            label: GazePoint::default(),
            index: 0,
        };

        let out = TensorPipeline::with_recolor()
            .apply(stacked, &mut StdRng::seed_from_u64(5))
            .expect("apply");
        for channel in 0..BASE_CHANNELS {
            assert_eq!(out.image[[channel, 0, 0]], out.image[[channel + 3, 0, 0]]);
            assert_eq!(out.image[[channel, 0, 0]], out.image[[channel + 6, 0, 0]]);
        }
    }
}
