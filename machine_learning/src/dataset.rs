use ndarray::{Array3, ArrayView3, Axis};

use crate::{MlErr, Result};

/// Side length, in pixels, of every image.
pub const IMAGE_SIDE: usize = 32;

/// Amount of color channels of every image.
pub const CHANNELS: usize = 3;

/// Amount of floats in a single image.
pub const IMAGE_LEN: usize = IMAGE_SIDE * IMAGE_SIDE * CHANNELS;

/// Amount of classes a label can take.
pub const NUM_CLASSES: usize = 10;

/// A single image with its class.
///
/// The image is stored interleaved as `(row, col, channel)` with normalized floats.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledSample {
    image: Array3<f32>,
    label: usize,
}

impl LabeledSample {
    /// Creates a new `LabeledSample`.
    ///
    /// # Arguments
    /// * `label` - The class of the image, in `[0, NUM_CLASSES)`.
    /// * `pixels` - `IMAGE_LEN` interleaved normalized pixels.
    ///
    /// # Returns
    /// A new `LabeledSample` or an error if the label or the pixel count are invalid.
    pub fn new(label: usize, pixels: Vec<f32>) -> Result<Self> {
        if label >= NUM_CLASSES {
            return Err(MlErr::LabelOutOfRange {
                label,
                classes: NUM_CLASSES,
            });
        }

        if pixels.len() != IMAGE_LEN {
            return Err(MlErr::SizeMismatch {
                a: "pixels",
                b: "image",
                got: pixels.len(),
                expected: IMAGE_LEN,
            });
        }

        let image = Array3::from_shape_vec((IMAGE_SIDE, IMAGE_SIDE, CHANNELS), pixels)?;
        Ok(Self { image, label })
    }

    /// Creates a new `LabeledSample` from a raw planar image.
    ///
    /// The bytes hold a full red plane, then green, then blue. Every byte is mapped
    /// to `byte * 2 / 255`.
    ///
    /// # Arguments
    /// * `label` - The class of the image.
    /// * `planes` - `IMAGE_LEN` raw bytes.
    ///
    /// # Returns
    /// A new `LabeledSample` or an error if the label or the byte count are invalid.
    pub fn from_planar_bytes(label: u8, planes: &[u8]) -> Result<Self> {
        if planes.len() != IMAGE_LEN {
            return Err(MlErr::SizeMismatch {
                a: "bytes",
                b: "image",
                got: planes.len(),
                expected: IMAGE_LEN,
            });
        }

        let plane_len = IMAGE_SIDE * IMAGE_SIDE;
        let mut pixels = vec![0.0; IMAGE_LEN];

        for (ch, plane) in planes.chunks_exact(plane_len).enumerate() {
            for (i, &byte) in plane.iter().enumerate() {
                pixels[i * CHANNELS + ch] = byte as f32 * 2.0 / 255.0;
            }
        }

        Self::new(label as usize, pixels)
    }

    #[inline]
    pub fn image(&self) -> ArrayView3<'_, f32> {
        self.image.view()
    }

    #[inline]
    pub fn label(&self) -> usize {
        self.label
    }

    /// Returns the mean of every channel of this image.
    pub fn channel_mean(&self) -> [f32; CHANNELS] {
        let mut mean = [0.0; CHANNELS];

        for (ch, plane) in self.image.axis_iter(Axis(2)).enumerate() {
            mean[ch] = plane.mean().unwrap_or_default();
        }

        mean
    }
}

/// An in-memory collection of labeled samples, immutable once loaded.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    samples: Vec<LabeledSample>,
}

impl Dataset {
    /// Creates a new `Dataset`.
    ///
    /// # Arguments
    /// * `samples` - The samples this dataset owns.
    ///
    /// # Returns
    /// A new `Dataset` instance.
    pub fn new(samples: Vec<LabeledSample>) -> Self {
        Self { samples }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Returns the sample at `idx`.
    ///
    /// # Returns
    /// The sample or an error if `idx` is out of bounds.
    #[inline]
    pub fn get(&self, idx: usize) -> Result<&LabeledSample> {
        self.samples.get(idx).ok_or(MlErr::IndexOutOfRange {
            idx,
            len: self.samples.len(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &LabeledSample> {
        self.samples.iter()
    }

    /// Computes the per channel mean of the dataset, that is, the mean over
    /// images of every image's own channel mean.
    ///
    /// # Returns
    /// The mean of every channel, or zeros for an empty dataset.
    pub fn channel_mean(&self) -> [f32; CHANNELS] {
        if self.samples.is_empty() {
            return [0.0; CHANNELS];
        }

        // Accumulated in f64, the dataset can hold tens of thousands of images.
        let mut acc = [0.0f64; CHANNELS];
        for sample in &self.samples {
            for (a, m) in acc.iter_mut().zip(sample.channel_mean()) {
                *a += m as f64;
            }
        }

        let n = self.samples.len() as f64;
        acc.map(|a| (a / n) as f32)
    }
}

impl FromIterator<LabeledSample> for Dataset {
    fn from_iter<I: IntoIterator<Item = LabeledSample>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(label: usize, rgb: [f32; 3]) -> LabeledSample {
        let pixels = (0..IMAGE_SIDE * IMAGE_SIDE).flat_map(|_| rgb).collect();
        LabeledSample::new(label, pixels).unwrap()
    }

    #[test]
    fn rejects_labels_out_of_range() {
        let res = LabeledSample::new(NUM_CLASSES, vec![0.0; IMAGE_LEN]);
        assert!(matches!(res, Err(MlErr::LabelOutOfRange { label: 10, .. })));
    }

    #[test]
    fn rejects_wrong_pixel_count() {
        let res = LabeledSample::new(0, vec![0.0; IMAGE_LEN - 1]);
        assert!(matches!(res, Err(MlErr::SizeMismatch { .. })));
    }

    #[test]
    fn planar_bytes_are_interleaved_and_normalized() {
        let plane = IMAGE_SIDE * IMAGE_SIDE;
        let mut bytes = vec![0u8; IMAGE_LEN];
        bytes[..plane].fill(255);
        bytes[plane + 1] = 51;

        let sample = LabeledSample::from_planar_bytes(7, &bytes).unwrap();
        let image = sample.image();

        assert_eq!(sample.label(), 7);
        assert_eq!(image[[0, 0, 0]], 2.0);
        assert_eq!(image[[0, 0, 1]], 0.0);
        assert!((image[[0, 1, 1]] - 0.4).abs() < 1e-6);
        assert_eq!(image[[31, 31, 2]], 0.0);
    }

    #[test]
    fn dataset_channel_mean_averages_image_means() {
        let ds: Dataset = [constant(0, [0.0, 1.0, 2.0]), constant(1, [1.0, 1.0, 0.0])]
            .into_iter()
            .collect();

        assert_eq!(ds.len(), 2);
        assert_eq!(ds.channel_mean(), [0.5, 1.0, 1.0]);
    }

    #[test]
    fn get_out_of_bounds_fails() {
        let ds = Dataset::new(vec![constant(3, [0.0; 3])]);
        assert_eq!(ds.get(0).unwrap().label(), 3);
        assert!(matches!(ds.get(1), Err(MlErr::IndexOutOfRange { idx: 1, len: 1 })));
    }
}
