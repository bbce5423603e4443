use std::io;

use crate::{
    error::Result,
    specs::{LossFnSpec, OptimizerSpec},
};

/// A trainable model, as seen by a training loop.
///
/// The model owns its parameters and the workspace its steps run on, so two
/// steps must never run at the same time. Callers that issue steps from more
/// than one queue are responsible for ordering them.
///
/// Releasing the model's resources is done by dropping it.
pub trait Model: Send {
    /// Returns whether the compute backend this model runs on is present.
    ///
    /// Harnesses check this before allocating anything and skip the run when
    /// it returns `false`.
    fn backend_available(&self) -> bool {
        true
    }

    /// Prepares the model for inputs of a fixed shape.
    ///
    /// # Arguments
    /// * `input_shape` - The shape of every input batch, batch dimension first.
    /// * `optimizer` - The optimizer used by `fit`.
    /// * `loss` - The loss minimized by `fit`.
    ///
    /// # Returns
    /// An error if the shape or the specs are not supported.
    fn compile(&mut self, input_shape: &[usize], optimizer: OptimizerSpec, loss: LossFnSpec) -> Result<()>;

    /// Runs a forward pass, the loss, a backward pass and a parameter update.
    ///
    /// # Arguments
    /// * `inputs` - A batch shaped as given to `compile`.
    /// * `labels` - One class index per sample.
    /// * `outputs` - Receives the model's output for the batch.
    fn fit(&mut self, inputs: &[f32], labels: &[f32], outputs: &mut [f32]) -> Result<()>;

    /// Runs a forward pass only.
    ///
    /// # Arguments
    /// * `inputs` - A batch shaped as given to `compile`.
    /// * `outputs` - Receives the model's output for the batch.
    fn evaluate(&mut self, inputs: &[f32], outputs: &mut [f32]) -> Result<()>;

    /// Replaces the optimizer used by the following `fit` calls, keeping its state.
    fn set_minimizer(&mut self, optimizer: OptimizerSpec) -> Result<()>;

    /// Writes a graphviz description of the model, if it has one.
    fn write_dot(&self, w: &mut dyn io::Write) -> io::Result<()> {
        let _ = w;
        Ok(())
    }
}

impl<T: Model + ?Sized> Model for Box<T> {
    fn backend_available(&self) -> bool {
        (**self).backend_available()
    }

    fn compile(&mut self, input_shape: &[usize], optimizer: OptimizerSpec, loss: LossFnSpec) -> Result<()> {
        (**self).compile(input_shape, optimizer, loss)
    }

    fn fit(&mut self, inputs: &[f32], labels: &[f32], outputs: &mut [f32]) -> Result<()> {
        (**self).fit(inputs, labels, outputs)
    }

    fn evaluate(&mut self, inputs: &[f32], outputs: &mut [f32]) -> Result<()> {
        (**self).evaluate(inputs, outputs)
    }

    fn set_minimizer(&mut self, optimizer: OptimizerSpec) -> Result<()> {
        (**self).set_minimizer(optimizer)
    }

    fn write_dot(&self, w: &mut dyn io::Write) -> io::Result<()> {
        (**self).write_dot(w)
    }
}
