//! Background randomisation.
//!
//! Synthetic renders use a flat background. The colour of pixel `(0, 0)` is
//! taken as that background and every pixel with exactly that colour is
//! replaced with uniform noise.

use image::{Rgb, RgbImage};
use rand::{Rng, RngExt};

/// Replace background-coloured pixels with random ones.
///
/// Returns the number of replaced pixels.
pub fn randomize_background<R: Rng + ?Sized>(image: &mut RgbImage, rng: &mut R) -> usize {
    if image.width() == 0 || image.height() == 0 {
        return 0;
    }

    let background = *image.get_pixel(0, 0);
    let mut replaced = 0;

    for pixel in image.pixels_mut() {
        if *pixel == background {
            *pixel = Rgb([rng.random(), rng.random(), rng.random()]);
            replaced += 1;
        }
    }

    replaced
}
