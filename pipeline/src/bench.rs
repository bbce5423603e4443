use std::fs::File;

use log::info;
use machine_learning::{NUM_CLASSES, arch::SoftmaxRegression, synthetic::SyntheticCifar};
use rand::{SeedableRng, rngs::StdRng};

use crate::{HarnessConfig, Result, TrainLoop, TrainReport};

/// The result of a benchmark run.
#[derive(Debug, Clone)]
pub struct BenchOutcome {
    pub report: TrainReport,
    /// Top-1 accuracy of the last epoch.
    pub accuracy: f32,
    pub threshold: f32,
}

impl BenchOutcome {
    #[inline]
    pub fn passed(&self) -> bool {
        self.accuracy >= self.threshold
    }
}

/// Trains a `SoftmaxRegression` on synthetic CIFAR shaped data.
///
/// Writes the model's graph first if `dot_path` is set.
///
/// # Returns
/// The outcome, or `BackendUnavailable` before anything is generated.
pub fn run(cfg: HarnessConfig) -> Result<BenchOutcome> {
    let HarnessConfig { pipeline, bench } = cfg;

    let model = SoftmaxRegression::new(NUM_CLASSES, pipeline.seed);
    let dot_path = pipeline.dot_path.clone();
    let mut train_loop = TrainLoop::new(pipeline, model)?;

    if let Some(path) = dot_path {
        let mut file = File::create(&path)?;
        train_loop.write_dot(&mut file)?;
        info!("model graph written to {}", path.display());
    }

    let generator = SyntheticCifar::new(bench.noise)?;
    let mut rng = StdRng::seed_from_u64(bench.data_seed);
    let train = generator.generate(bench.train_size, &mut rng)?;
    let test = generator.generate(bench.test_size, &mut rng)?;
    let mean = train.channel_mean();
    info!(train = train.len(), test = test.len(); "datasets generated, channel mean {mean:?}");

    let report = train_loop.run(&train, &test, &mean)?;
    let accuracy = report.last().map_or(0.0, |r| r.accuracy());

    Ok(BenchOutcome {
        report,
        accuracy,
        threshold: bench.accuracy_threshold,
    })
}
