use std::{
    env, fs,
    path::{Path, PathBuf},
};

use log::info;
use machine_learning::specs::OptimizerSpec;
use serde::{Deserialize, Serialize};

use crate::{PipelineErr, Result};

/// Environment variable holding the path of the json configuration file.
pub const CONFIG_ENV: &str = "PIPELINE_CONFIG";

/// Immutable execution bounds for a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Samples per iteration, also the evaluation chunk size.
    pub batch_size: usize,
    /// Epochs to train for.
    pub epochs: usize,
    /// The optimizer the model starts with.
    pub optimizer: OptimizerSpec,
    /// Epochs between learning rate decays.
    pub lr_decay_every: usize,
    /// Factor the learning rate is multiplied by on every decay.
    pub lr_decay_factor: f32,
    /// Seed of the batch sampling generator.
    pub seed: u64,
    /// Ordinal of the device the slots are allocated on.
    pub device: usize,
    /// Where to write the model's graph description, if anywhere.
    pub dot_path: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 256,
            epochs: 30,
            optimizer: OptimizerSpec::default(),
            lr_decay_every: 5,
            lr_decay_factor: 0.5,
            seed: 0,
            device: 0,
            dot_path: None,
        }
    }
}

impl PipelineConfig {
    /// Checks the bounds are usable.
    ///
    /// # Returns
    /// An `InvalidConfig` error describing the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(PipelineErr::InvalidConfig("batch_size must be positive".into()));
        }

        if self.epochs == 0 {
            return Err(PipelineErr::InvalidConfig("epochs must be positive".into()));
        }

        if self.lr_decay_every == 0 {
            return Err(PipelineErr::InvalidConfig("lr_decay_every must be positive".into()));
        }

        let lr = self.optimizer.learning_rate();
        if !(lr > 0.0) {
            return Err(PipelineErr::InvalidConfig(format!(
                "learning_rate must be positive, got {lr}"
            )));
        }

        let factor = self.lr_decay_factor;
        if !(factor > 0.0 && factor <= 1.0) {
            return Err(PipelineErr::InvalidConfig(format!(
                "lr_decay_factor must be in (0, 1], got {factor}"
            )));
        }

        Ok(())
    }
}

/// Sizes and pass criteria of the synthetic benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    pub train_size: usize,
    pub test_size: usize,
    /// Standard deviation of the per pixel noise of the generated images.
    pub noise: f32,
    /// Seed of the dataset generator.
    pub data_seed: u64,
    /// Minimum final top-1 accuracy, in `[0, 1]`.
    pub accuracy_threshold: f32,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            train_size: 5_000,
            test_size: 1_000,
            noise: 0.5,
            data_seed: 7,
            accuracy_threshold: 0.75,
        }
    }
}

impl BenchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.train_size == 0 || self.test_size == 0 {
            return Err(PipelineErr::InvalidConfig(
                "train_size and test_size must be positive".into(),
            ));
        }

        if !(self.noise >= 0.0 && self.noise.is_finite()) {
            return Err(PipelineErr::InvalidConfig(format!(
                "noise must be a finite non negative deviation, got {}",
                self.noise
            )));
        }

        if !(0.0..=1.0).contains(&self.accuracy_threshold) {
            return Err(PipelineErr::InvalidConfig(format!(
                "accuracy_threshold must be in [0, 1], got {}",
                self.accuracy_threshold
            )));
        }

        Ok(())
    }
}

/// Everything the benchmark binary reads from its configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub pipeline: PipelineConfig,
    pub bench: BenchConfig,
}

impl HarnessConfig {
    /// Parses and validates a json configuration, missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.pipeline.validate()?;
        cfg.bench.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Loads the file `PIPELINE_CONFIG` points to, or the defaults if it is unset.
    pub fn from_env() -> Result<Self> {
        match env::var_os(CONFIG_ENV) {
            Some(path) => {
                let path = PathBuf::from(path);
                info!("loading configuration from {}", path.display());
                Self::from_path(&path)
            }
            None => {
                info!("{CONFIG_ENV} not set, using the default configuration");
                Ok(Self::default())
            }
        }
    }
}
