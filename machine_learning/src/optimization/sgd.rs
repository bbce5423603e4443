use super::Optimizer;
use crate::specs::OptimizerSpec;

/// Stochastic gradient descent with weight decay, momentum and dampening.
///
/// For every parameter `w` with gradient `g`:
///
/// ```text
/// d   = g + decay * w
/// buf = momentum * buf + (1 - dampening) * d
/// w  -= learning_rate * buf
/// ```
pub struct Sgd {
    learning_rate: f32,
    decay: f32,
    momentum: f32,
    dampening: f32,
    velocity: Vec<f32>,
}

impl Sgd {
    /// Returns a new `Sgd`.
    ///
    /// # Arguments
    /// * `spec` - The hyperparameters.
    /// * `nparams` - The amount of parameters it will update.
    pub fn new(spec: OptimizerSpec, nparams: usize) -> Self {
        let OptimizerSpec::Sgd {
            learning_rate,
            decay,
            momentum,
            dampening,
        } = spec;

        Self {
            learning_rate,
            decay,
            momentum,
            dampening,
            velocity: vec![0.0; nparams],
        }
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    /// Replaces every hyperparameter with the ones in `spec`, keeping the accumulated velocity.
    pub fn reconfigure(&mut self, spec: OptimizerSpec) {
        let OptimizerSpec::Sgd {
            learning_rate,
            decay,
            momentum,
            dampening,
        } = spec;

        self.set_learning_rate(learning_rate);
        self.decay = decay;
        self.momentum = momentum;
        self.dampening = dampening;
    }
}

impl Optimizer for Sgd {
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) {
        let Self {
            learning_rate: lr,
            decay,
            momentum,
            dampening,
            ref mut velocity,
        } = *self;

        for ((w, g), v) in params.iter_mut().zip(grad).zip(velocity.iter_mut()) {
            let d = g + decay * *w;
            *v = momentum * *v + (1.0 - dampening) * d;
            *w -= lr * *v;
        }
    }

    fn set_learning_rate(&mut self, learning_rate: f32) {
        self.learning_rate = learning_rate;
    }
}
