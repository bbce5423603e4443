use rand::Rng;

use crate::{
    MlErr, Result,
    augment::{Augmentation, augment},
    dataset::{CHANNELS, Dataset, IMAGE_LEN},
};

/// Fills a host batch with randomly drawn, augmented training samples.
///
/// The batch size is given by `labels.len()`. `inputs` is zeroed first so that
/// the augmentation's out of bounds pixels end up as zero padding. Samples are
/// drawn uniformly and with replacement, a batch may contain duplicates.
///
/// For every sample `rng` is consumed in order: index, flip, `pad_x`, `pad_y`.
///
/// # Arguments
/// * `dataset` - The training set.
/// * `mean` - The per channel mean subtracted from every pixel.
/// * `rng` - A caller owned random number generator.
/// * `inputs` - A planar `(N, C, H, W)` buffer of `labels.len()` images.
/// * `labels` - The label buffer, one class index per sample.
///
/// # Returns
/// An error if the dataset is empty or the buffers don't match.
pub fn fill_batch<R: Rng + ?Sized>(
    dataset: &Dataset,
    mean: &[f32; CHANNELS],
    rng: &mut R,
    inputs: &mut [f32],
    labels: &mut [f32],
) -> Result<()> {
    if dataset.is_empty() {
        return Err(MlErr::EmptyDataset);
    }

    check_buffers(inputs, labels.len())?;
    inputs.fill(0.0);

    for (image, label) in inputs.chunks_exact_mut(IMAGE_LEN).zip(labels.iter_mut()) {
        let idx = rng.random_range(0..dataset.len());
        let sample = dataset.get(idx)?;
        augment(sample, mean, image, rng)?;
        *label = sample.label() as f32;
    }

    Ok(())
}

/// Fills a host batch with the samples of `dataset` starting at `start`, without
/// any augmentation.
///
/// Only the first `n` rows are written, where `n` is the returned amount; the rest
/// of `inputs` is left zeroed.
///
/// # Arguments
/// * `dataset` - The held out set.
/// * `start` - Index of the first sample of the chunk.
/// * `mean` - The per channel mean subtracted from every pixel.
/// * `inputs` - A planar `(N, C, H, W)` buffer of `labels.len()` images.
/// * `labels` - Receives the true class of every filled row.
///
/// # Returns
/// The amount of rows filled, zero once `start` reaches the end of the dataset.
pub fn fill_eval_chunk(
    dataset: &Dataset,
    start: usize,
    mean: &[f32; CHANNELS],
    inputs: &mut [f32],
    labels: &mut [usize],
) -> Result<usize> {
    check_buffers(inputs, labels.len())?;
    inputs.fill(0.0);

    let n = dataset.len().saturating_sub(start).min(labels.len());
    let identity = Augmentation::identity();

    for (k, (image, label)) in inputs
        .chunks_exact_mut(IMAGE_LEN)
        .zip(labels.iter_mut())
        .take(n)
        .enumerate()
    {
        let sample = dataset.get(start + k)?;
        identity.apply(sample, mean, image)?;
        *label = sample.label();
    }

    Ok(n)
}

fn check_buffers(inputs: &[f32], batch_size: usize) -> Result<()> {
    if inputs.len() != batch_size * IMAGE_LEN {
        return Err(MlErr::SizeMismatch {
            a: "inputs",
            b: "labels",
            got: inputs.len(),
            expected: batch_size * IMAGE_LEN,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::dataset::LabeledSample;

    fn filled(label: usize, value: f32) -> LabeledSample {
        LabeledSample::new(label, vec![value; IMAGE_LEN]).unwrap()
    }

    fn dataset() -> Dataset {
        (0..5).map(|c| filled(c, 1.0 + c as f32)).collect()
    }

    #[test]
    fn batch_labels_match_the_drawn_images() {
        let ds = dataset();
        let mut rng = StdRng::seed_from_u64(0);
        let mut inputs = vec![-1.0; 8 * IMAGE_LEN];
        let mut labels = vec![-1.0; 8];

        fill_batch(&ds, &[0.0; CHANNELS], &mut rng, &mut inputs, &mut labels).unwrap();

        for (image, &label) in inputs.chunks_exact(IMAGE_LEN).zip(&labels) {
            let expected = 1.0 + label;
            assert!(image.iter().all(|&v| v == 0.0 || v == expected));
            // A shift of at most 4 pixels on each axis leaves most of the image.
            let pasted = image.iter().filter(|&&v| v == expected).count();
            assert!(pasted >= 28 * 28 * CHANNELS);
        }
    }

    #[test]
    fn batch_is_reproducible_and_draws_with_replacement() {
        let ds = dataset();
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut inputs = vec![0.0; 32 * IMAGE_LEN];
            let mut labels = vec![0.0; 32];
            fill_batch(&ds, &[0.0; CHANNELS], &mut rng, &mut inputs, &mut labels).unwrap();
            (inputs, labels)
        };

        let (inputs, labels) = run(0);
        assert_eq!((inputs.clone(), labels.clone()), run(0));

        // 32 draws out of 5 samples must repeat.
        let mut distinct = labels.clone();
        distinct.sort_by(f32::total_cmp);
        distinct.dedup();
        assert!(distinct.len() < labels.len());
    }

    #[test]
    fn empty_dataset_fails() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut inputs = vec![0.0; IMAGE_LEN];
        let mut labels = vec![0.0; 1];
        let res = fill_batch(&Dataset::default(), &[0.0; 3], &mut rng, &mut inputs, &mut labels);
        assert!(matches!(res, Err(MlErr::EmptyDataset)));
    }

    #[test]
    fn mismatched_buffers_fail() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut inputs = vec![0.0; 2 * IMAGE_LEN];
        let mut labels = vec![0.0; 3];
        let res = fill_batch(&dataset(), &[0.0; 3], &mut rng, &mut inputs, &mut labels);
        assert!(matches!(res, Err(MlErr::SizeMismatch { .. })));
    }

    #[test]
    fn eval_chunks_are_deterministic_and_partial_at_the_end() {
        let ds = dataset();
        let mean = [1.0; CHANNELS];
        let mut inputs = vec![9.0; 4 * IMAGE_LEN];
        let mut labels = vec![0; 4];

        assert_eq!(fill_eval_chunk(&ds, 0, &mean, &mut inputs, &mut labels).unwrap(), 4);
        assert_eq!(labels, [0, 1, 2, 3]);
        assert!(inputs[3 * IMAGE_LEN..].iter().all(|&v| v == 3.0));

        assert_eq!(fill_eval_chunk(&ds, 4, &mean, &mut inputs, &mut labels).unwrap(), 1);
        assert_eq!(labels[0], 4);
        assert!(inputs[..IMAGE_LEN].iter().all(|&v| v == 4.0));
        assert!(inputs[IMAGE_LEN..].iter().all(|&v| v == 0.0));

        assert_eq!(fill_eval_chunk(&ds, 5, &mean, &mut inputs, &mut labels).unwrap(), 0);
    }
}
