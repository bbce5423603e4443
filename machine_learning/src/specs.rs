use serde::{Deserialize, Serialize};

/// Describes the optimizer a model minimizes its loss with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerSpec {
    Sgd {
        learning_rate: f32,
        decay: f32,
        momentum: f32,
        dampening: f32,
    },
}

impl OptimizerSpec {
    /// Returns the learning rate of this spec.
    pub fn learning_rate(&self) -> f32 {
        match *self {
            OptimizerSpec::Sgd { learning_rate, .. } => learning_rate,
        }
    }

    /// Returns a copy of this spec with a different learning rate.
    ///
    /// # Arguments
    /// * `rate` - The new learning rate.
    pub fn with_learning_rate(self, rate: f32) -> Self {
        match self {
            OptimizerSpec::Sgd {
                decay,
                momentum,
                dampening,
                ..
            } => OptimizerSpec::Sgd {
                learning_rate: rate,
                decay,
                momentum,
                dampening,
            },
        }
    }
}

impl Default for OptimizerSpec {
    fn default() -> Self {
        OptimizerSpec::Sgd {
            learning_rate: 0.001,
            decay: 0.99,
            momentum: 0.9,
            dampening: 0.9,
        }
    }
}

/// Describes the loss a model is trained on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossFnSpec {
    #[default]
    CategoricalCrossEntropy,
}
