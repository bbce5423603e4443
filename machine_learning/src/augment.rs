use ndarray::ArrayViewMut3;
use rand::Rng;

use crate::{
    MlErr, Result,
    dataset::{CHANNELS, IMAGE_LEN, IMAGE_SIDE, LabeledSample},
};

/// Maximum translation, in pixels, applied on each axis.
pub const MAX_SHIFT: i32 = 4;

/// A random crop and flip applied to a single image.
///
/// The source image is translated by `(pad_x, pad_y)` inside a fixed
/// `IMAGE_SIDE` x `IMAGE_SIDE` window and optionally mirrored horizontally.
/// Destination pixels that fall outside the source are left untouched, so
/// a zeroed destination yields zero padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Augmentation {
    pub flip: bool,
    pub pad_x: i32,
    pub pad_y: i32,
}

impl Augmentation {
    /// The transform that copies the image as is.
    pub fn identity() -> Self {
        Self {
            flip: false,
            pad_x: 0,
            pad_y: 0,
        }
    }

    /// Draws a new augmentation.
    ///
    /// Consumes exactly three values of `rng`, in order: flip, `pad_x`, `pad_y`.
    ///
    /// # Arguments
    /// * `rng` - A random number generator.
    ///
    /// # Returns
    /// A new `Augmentation` with a fair coin flip and shifts in `[-MAX_SHIFT, MAX_SHIFT]`.
    pub fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let flip = rng.random::<f64>() >= 0.5;
        let pad_x = shift(rng);
        let pad_y = shift(rng);
        Self { flip, pad_x, pad_y }
    }

    /// Writes `sample - mean` into `out` following this transform.
    ///
    /// # Arguments
    /// * `sample` - The source image.
    /// * `mean` - The per channel mean to subtract.
    /// * `out` - A planar `(channel, row, col)` destination of exactly one image.
    ///
    /// # Returns
    /// An error if `out` can't hold exactly one image.
    pub fn apply(&self, sample: &LabeledSample, mean: &[f32; CHANNELS], out: &mut [f32]) -> Result<()> {
        if out.len() != IMAGE_LEN {
            return Err(MlErr::SizeMismatch {
                a: "out",
                b: "image",
                got: out.len(),
                expected: IMAGE_LEN,
            });
        }

        let mut dst = ArrayViewMut3::from_shape((CHANNELS, IMAGE_SIDE, IMAGE_SIDE), out)?;
        let src = sample.image();
        let side = IMAGE_SIDE as i32;

        for row in self.pad_y.max(0)..(side + self.pad_y).min(side) {
            let src_row = (row - self.pad_y) as usize;

            for col in self.pad_x.max(0)..(side + self.pad_x).min(side) {
                let src_col = (col - self.pad_x) as usize;
                let dst_col = if self.flip { side - 1 - col } else { col };

                for (ch, m) in mean.iter().enumerate() {
                    dst[[ch, row as usize, dst_col as usize]] = src[[src_row, src_col, ch]] - m;
                }
            }
        }

        Ok(())
    }
}

/// Draws a fresh augmentation from `rng` and applies it.
///
/// # Returns
/// The augmentation that was applied.
pub fn augment<R: Rng + ?Sized>(
    sample: &LabeledSample,
    mean: &[f32; CHANNELS],
    out: &mut [f32],
    rng: &mut R,
) -> Result<Augmentation> {
    let aug = Augmentation::sample(rng);
    aug.apply(sample, mean, out)?;
    Ok(aug)
}

// round(U[0, 1) * 2 * MAX_SHIFT) - MAX_SHIFT
fn shift<R: Rng + ?Sized>(rng: &mut R) -> i32 {
    (rng.random::<f64>() * (2 * MAX_SHIFT) as f64 + 0.5) as i32 - MAX_SHIFT
}
