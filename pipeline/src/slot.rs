use machine_learning::{CHANNELS, IMAGE_SIDE, NUM_CLASSES};

use crate::{
    Result,
    device::{Placement, Stream, Tensor, TensorParam},
};

/// Amount of slots the pipeline alternates between.
pub const SLOTS: usize = 2;

/// One half of the double buffer.
///
/// Holds the pinned host batch the sampler fills, the device tensors the model
/// reads and writes and the stream all of the slot's device work is issued on.
/// Everything is released together when the slot is dropped, the stream
/// finishing its queued work first.
#[derive(Debug)]
pub struct Slot {
    index: usize,
    pub host_inputs: Tensor,
    pub host_labels: Tensor,
    pub inputs: Tensor,
    pub labels: Tensor,
    pub outputs: Tensor,
    pub stream: Stream,
}

impl Slot {
    /// Allocates a slot.
    ///
    /// # Arguments
    /// * `index` - The slot index, also the id of its stream.
    /// * `batch_size` - The amount of samples per batch.
    /// * `device` - Ordinal of the device to allocate on.
    ///
    /// # Returns
    /// A new `Slot` or an error if its stream couldn't be created.
    pub fn new(index: usize, batch_size: usize, device: usize) -> Result<Self> {
        let input_shape = input_shape(batch_size);
        let label_shape = [batch_size, 1];

        let mut host_inputs = Tensor::new(TensorParam::host(&input_shape));
        let mut host_labels = Tensor::new(TensorParam::host(&label_shape));
        host_inputs.pin_memory()?;
        host_labels.pin_memory()?;

        Ok(Self {
            index,
            host_inputs,
            host_labels,
            inputs: Tensor::new(TensorParam::device(device, &input_shape)),
            labels: Tensor::new(TensorParam::device(device, &label_shape)),
            outputs: Tensor::new(TensorParam::device(device, &[batch_size, NUM_CLASSES])),
            stream: Stream::new(index, Placement::Device(device))?,
        })
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Returns the `(N, C, H, W)` shape of a batch of `batch_size` images.
pub fn input_shape(batch_size: usize) -> [usize; 4] {
    [batch_size, CHANNELS, IMAGE_SIDE, IMAGE_SIDE]
}

/// Ping pong selection of the active slot.
#[derive(Debug, Clone, Default)]
pub struct RoundRobin {
    current: usize,
}

impl RoundRobin {
    /// Returns the slot the next iteration runs on.
    #[inline]
    pub fn current(&self) -> usize {
        self.current
    }

    /// Returns the slot the previous iteration ran on.
    #[inline]
    pub fn other(&self) -> usize {
        1 - self.current
    }

    #[inline]
    pub fn advance(&mut self) {
        self.current = self.other();
    }

    /// Makes the next iteration run on slot 0.
    #[inline]
    pub fn reset(&mut self) {
        self.current = 0;
    }
}
