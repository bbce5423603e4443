use std::time::Duration;

#[derive(Debug, Default, Clone)]
pub struct PipelineMetrics {
    pub fill_time: Duration,
    pub wait_time: Duration,
    pub eval_time: Duration,

    pub iterations: u64,
    pub samples: u64,
    pub epochs: u64,
}

impl PipelineMetrics {
    #[inline]
    pub fn bump_iteration(&mut self) {
        self.iterations += 1;
    }

    #[inline]
    pub fn bump_epoch(&mut self) {
        self.epochs += 1;
    }

    #[inline]
    pub fn add_samples(&mut self, n: usize) {
        self.samples += n as u64;
    }
}

/// The outcome of the evaluation pass run at the end of an epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochReport {
    /// The epoch that just ended, starting at 1.
    pub epoch: usize,
    /// The learning rate in force for the next epoch.
    pub learning_rate: f32,
    pub correct: usize,
    pub total: usize,
}

impl EpochReport {
    /// Returns the top-1 accuracy in `[0, 1]`, zero for an empty test set.
    pub fn accuracy(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }

        self.correct as f32 / self.total as f32
    }
}

/// Everything a training run produced.
#[derive(Debug, Clone, Default)]
pub struct TrainReport {
    pub epochs: Vec<EpochReport>,
    pub metrics: PipelineMetrics,
}

impl TrainReport {
    /// Returns the evaluation of the last epoch, if any ran.
    pub fn last(&self) -> Option<&EpochReport> {
        self.epochs.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accuracy_is_the_correct_fraction() {
        let report = EpochReport {
            epoch: 1,
            learning_rate: 0.1,
            correct: 3,
            total: 4,
        };
        assert_eq!(report.accuracy(), 0.75);

        let empty = EpochReport { total: 0, correct: 0, ..report };
        assert_eq!(empty.accuracy(), 0.0);
    }
}
