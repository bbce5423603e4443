use ndarray::{Array2, ArrayView2};

/// A loss over a batch, one row of predictions per sample.
pub trait LossFn {
    /// Returns the batch mean of the loss.
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32;

    /// Returns the gradient of `loss` with respect to the layer that produced `y_pred`.
    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32>;
}
