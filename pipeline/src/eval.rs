use log::debug;
use machine_learning::{CHANNELS, Dataset, NUM_CLASSES, arch::Model, batch};
use ndarray::{ArrayView1, ArrayView2, Axis};
use parking_lot::Mutex;

use crate::{
    Result,
    device::{Tensor, transfer},
    slot::Slot,
};

/// Returns the index of the highest score, the lowest index on ties.
///
/// Rows where no score is above `f32::MIN`, such as all `NaN` or all
/// `-inf`, have no arg max.
pub fn argmax(scores: ArrayView1<'_, f32>) -> Option<usize> {
    let mut best = None;
    let mut max = f32::MIN;

    for (i, &score) in scores.iter().enumerate() {
        if score > max {
            max = score;
            best = Some(i);
        }
    }

    best
}

/// Counts the rows of `scores` whose arg max equals the matching label.
///
/// Only the first `labels.len()` rows are scored.
pub fn count_correct(scores: ArrayView2<'_, f32>, labels: &[usize]) -> usize {
    scores
        .axis_iter(Axis(0))
        .zip(labels)
        .filter(|(row, label)| argmax(row.view()) == Some(**label))
        .count()
}

/// Buffers the evaluation pass borrows from the pipeline.
pub(crate) struct EvalPass<'a, M> {
    pub model: &'a Mutex<M>,
    pub slot: &'a Slot,
    pub host_outputs: &'a Tensor,
    pub labels: &'a mut [usize],
}

impl<M: Model> EvalPass<'_, M> {
    /// Scores the model on `dataset`, one batch sized chunk at a time.
    ///
    /// Samples are copied without augmentation, only the channel mean is
    /// removed. Runs synchronously, both streams must be drained.
    ///
    /// # Returns
    /// The amount of correctly classified samples.
    pub fn run(&mut self, dataset: &Dataset, mean: &[f32; CHANNELS]) -> Result<usize> {
        let batch_size = self.labels.len();
        let mut correct = 0;

        for chunk_start in (0..dataset.len()).step_by(batch_size) {
            let n = {
                let mut inputs = self.slot.host_inputs.lock();
                batch::fill_eval_chunk(dataset, chunk_start, mean, &mut inputs, self.labels)?
            };

            transfer(&[&self.slot.host_inputs], &[&self.slot.inputs], None)?;
            {
                let inputs = self.slot.inputs.lock();
                let mut outputs = self.slot.outputs.lock();
                self.model.lock().evaluate(&inputs, &mut outputs)?;
            }
            transfer(&[&self.slot.outputs], &[self.host_outputs], None)?;

            let outputs = self.host_outputs.lock();
            let scores = ArrayView2::from_shape((batch_size, NUM_CLASSES), &outputs[..])?;
            correct += count_correct(scores, &self.labels[..n]);
        }

        debug!(correct = correct, total = dataset.len(); "evaluation pass done");
        Ok(correct)
    }
}
