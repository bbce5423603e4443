use ndarray::{Array2, ArrayView2, Axis, Zip};

use super::LossFn;

/// Categorical cross entropy over softmax probabilities with sparse labels.
///
/// `y_pred` holds one row of class probabilities per sample and `y` a single
/// column with the class index of every sample. `loss_prime` is the gradient
/// with respect to the logits fed to the softmax, not the probabilities.
#[derive(Default, Clone, Copy)]
pub struct CategoricalCrossEntropy;

impl CategoricalCrossEntropy {
    /// Returns a new `CategoricalCrossEntropy`.
    pub fn new() -> Self {
        Self
    }
}

impl LossFn for CategoricalCrossEntropy {
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
        let n = y_pred.nrows().max(1) as f32;

        let total: f32 = y_pred
            .outer_iter()
            .zip(y.column(0))
            .map(|(row, &label)| -row[label as usize].max(f32::MIN_POSITIVE).ln())
            .sum();

        total / n
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        let scale = 1.0 / y_pred.nrows().max(1) as f32;
        let mut d = y_pred.to_owned();

        Zip::from(d.axis_iter_mut(Axis(0)))
            .and(y.column(0))
            .for_each(|mut row, &label| {
                row[label as usize] -= 1.0;
                row *= scale;
            });

        d
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn loss_is_the_mean_negative_log_likelihood() {
        let p = array![[0.5, 0.5], [0.25, 0.75]];
        let y = array![[0.0], [1.0]];
        let expected = -(0.5f32.ln() + 0.75f32.ln()) / 2.0;
        assert!((CategoricalCrossEntropy.loss(p.view(), y.view()) - expected).abs() < 1e-6);
    }

    #[test]
    fn loss_prime_subtracts_the_one_hot_target() {
        let p = array![[0.5, 0.5], [0.25, 0.75]];
        let y = array![[0.0], [1.0]];
        let d = CategoricalCrossEntropy.loss_prime(p.view(), y.view());
        assert_eq!(d, array![[-0.25, 0.25], [0.125, -0.125]]);
    }
}
