use std::f32::consts::TAU;

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::{
    MlErr, Result,
    dataset::{CHANNELS, Dataset, IMAGE_LEN, LabeledSample, NUM_CLASSES},
};

/// Generates CIFAR shaped datasets of flat colored images.
///
/// Every class has its own color, placed on a circle around the neutral gray
/// `(1, 1, 1)` so that, once the channel mean is removed, classes point in
/// evenly spread directions. Pixels get independent gaussian noise and are
/// clamped to the normalized `[0, 2]` range.
#[derive(Debug, Clone)]
pub struct SyntheticCifar {
    colors: [[f32; CHANNELS]; NUM_CLASSES],
    noise: Normal<f32>,
}

impl SyntheticCifar {
    /// Creates a new `SyntheticCifar`.
    ///
    /// # Arguments
    /// * `noise` - Standard deviation of the per pixel noise.
    ///
    /// # Returns
    /// A new generator or an error if `noise` is not a valid deviation.
    pub fn new(noise: f32) -> Result<Self> {
        if noise < 0.0 {
            return Err(MlErr::InvalidParameter {
                what: "noise",
                detail: format!("standard deviation must not be negative, got {noise}"),
            });
        }

        let noise = Normal::new(0.0, noise).map_err(|e| MlErr::InvalidParameter {
            what: "noise",
            detail: e.to_string(),
        })?;

        // Orthonormal basis of the plane orthogonal to the gray axis.
        let u = [1.0 / 2f32.sqrt(), -1.0 / 2f32.sqrt(), 0.0];
        let v = [1.0 / 6f32.sqrt(), 1.0 / 6f32.sqrt(), -2.0 / 6f32.sqrt()];

        let mut colors = [[0.0; CHANNELS]; NUM_CLASSES];
        for (c, color) in colors.iter_mut().enumerate() {
            let theta = TAU * c as f32 / NUM_CLASSES as f32;
            for ch in 0..CHANNELS {
                color[ch] = 1.0 + 0.8 * (theta.cos() * u[ch] + theta.sin() * v[ch]);
            }
        }

        Ok(Self { colors, noise })
    }

    /// Draws a single sample of class `label`.
    pub fn sample<R: Rng + ?Sized>(&self, label: usize, rng: &mut R) -> Result<LabeledSample> {
        let color = self
            .colors
            .get(label)
            .ok_or(MlErr::LabelOutOfRange {
                label,
                classes: NUM_CLASSES,
            })?;

        let pixels = (0..IMAGE_LEN)
            .map(|i| (color[i % CHANNELS] + self.noise.sample(rng)).clamp(0.0, 2.0))
            .collect();

        LabeledSample::new(label, pixels)
    }

    /// Generates a dataset of `len` samples with classes assigned round robin.
    pub fn generate<R: Rng + ?Sized>(&self, len: usize, rng: &mut R) -> Result<Dataset> {
        (0..len).map(|i| self.sample(i % NUM_CLASSES, rng)).collect()
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn classes_are_balanced_and_in_range() {
        let generator = SyntheticCifar::new(0.1).unwrap();
        let ds = generator.generate(25, &mut StdRng::seed_from_u64(0)).unwrap();

        assert_eq!(ds.len(), 25);
        let mut counts = [0; NUM_CLASSES];
        for sample in ds.iter() {
            counts[sample.label()] += 1;
            assert!(sample.image().iter().all(|&p| (0.0..=2.0).contains(&p)));
        }
        assert_eq!(counts, [3, 3, 3, 3, 3, 2, 2, 2, 2, 2]);
    }

    #[test]
    fn noiseless_mean_is_neutral_gray() {
        let generator = SyntheticCifar::new(0.0).unwrap();
        let ds = generator.generate(NUM_CLASSES, &mut StdRng::seed_from_u64(0)).unwrap();

        for m in ds.channel_mean() {
            assert!((m - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn negative_or_non_finite_noise_is_rejected() {
        for noise in [-1.0, -f32::MIN_POSITIVE, f32::NAN, f32::INFINITY] {
            assert!(
                matches!(SyntheticCifar::new(noise), Err(MlErr::InvalidParameter { what: "noise", .. })),
                "noise {noise}"
            );
        }
        assert!(SyntheticCifar::new(0.0).is_ok());
    }
}
