/// Defines when an epoch ends and when training stops.
///
/// An epoch is a fixed amount of iterations, `ceil(train_len / batch_size)`,
/// not a full pass over the data: batches are drawn with replacement.
#[derive(Debug, Clone)]
pub struct EpochSchedule {
    epoch_end: usize,
    epochs: usize,
    epoch: usize,
}

impl EpochSchedule {
    pub fn new(train_len: usize, batch_size: usize, epochs: usize) -> Self {
        Self {
            epoch_end: train_len.div_ceil(batch_size).max(1),
            epochs,
            epoch: 0,
        }
    }

    /// Returns the amount of iterations per epoch.
    #[inline]
    pub fn epoch_end(&self) -> usize {
        self.epoch_end
    }

    /// Returns true if iteration `i` is the last one of an epoch.
    #[inline]
    pub fn ends_epoch(&self, i: usize) -> bool {
        (i + 1) % self.epoch_end == 0
    }

    /// Marks an epoch as completed and returns its number.
    #[inline]
    pub fn advance(&mut self) -> usize {
        self.epoch += 1;
        self.epoch
    }

    #[inline]
    pub fn finished(&self) -> bool {
        self.epoch >= self.epochs
    }
}

/// Step decay of the learning rate, applied at epoch boundaries.
#[derive(Debug, Clone)]
pub struct LrSchedule {
    current: f32,
    every: usize,
    factor: f32,
}

impl LrSchedule {
    pub fn new(initial: f32, every: usize, factor: f32) -> Self {
        Self {
            current: initial,
            every,
            factor,
        }
    }

    #[inline]
    pub fn current(&self) -> f32 {
        self.current
    }

    /// Applies the decay due at the end of `epoch`.
    ///
    /// # Returns
    /// The new learning rate if it changed.
    pub fn on_epoch(&mut self, epoch: usize) -> Option<f32> {
        if self.every == 0 || epoch % self.every != 0 {
            return None;
        }

        self.current *= self.factor;
        Some(self.current)
    }
}
