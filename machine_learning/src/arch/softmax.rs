use std::io;

use log::trace;
use ndarray::{linalg, parallel::prelude::*, prelude::*};
use ndarray_rand::{RandomExt, rand_distr::Normal};
use rand::{SeedableRng, rngs::StdRng};

use super::{
    Model,
    loss::{CategoricalCrossEntropy, LossFn},
};
use crate::{
    MlErr, Result,
    optimization::{Optimizer, Sgd},
    specs::{LossFnSpec, OptimizerSpec},
};

/// A single dense layer followed by a softmax, trained with categorical cross
/// entropy. Runs entirely on the host.
///
/// Parameters are kept flat, weights `(features, classes)` first and then the
/// biases, the same layout the gradient buffer uses.
pub struct SoftmaxRegression {
    classes: usize,
    seed: u64,
    batch: usize,
    dim: (usize, usize),
    params: Vec<f32>,
    grad: Vec<f32>,
    optimizer: Option<Sgd>,
    loss_fn: CategoricalCrossEntropy,

    // Forward metadata
    probs: Array2<f32>,
}

impl SoftmaxRegression {
    /// Returns a new, uncompiled `SoftmaxRegression`.
    ///
    /// # Arguments
    /// * `classes` - The amount of outputs.
    /// * `seed` - Seed for the weight initialization.
    pub fn new(classes: usize, seed: u64) -> Self {
        Self {
            classes,
            seed,
            batch: 0,
            dim: (0, classes),
            params: Vec::new(),
            grad: Vec::new(),
            optimizer: None,
            loss_fn: CategoricalCrossEntropy::new(),
            probs: Array2::zeros((0, classes)),
        }
    }

    /// Returns the amount of parameters this model has.
    pub fn size(&self) -> usize {
        (self.dim.0 + 1) * self.dim.1
    }

    fn forward(&mut self, inputs: &[f32]) -> Result<()> {
        if self.optimizer.is_none() {
            return Err(MlErr::NotCompiled);
        }

        let x = ArrayView2::from_shape((self.batch, self.dim.0), inputs)?;
        let (w, b) = view_params(self.dim, &self.params)?;

        linalg::general_mat_mul(1.0, &x, &w, 0.0, &mut self.probs);
        self.probs += &b;

        self.probs
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .for_each(|mut row| {
                let max = row.fold(f32::MIN, |m, &v| m.max(v));
                row.mapv_inplace(|v| (v - max).exp());
                let sum = row.sum();
                row /= sum;
            });

        Ok(())
    }

    fn write_outputs(&self, outputs: &mut [f32]) -> Result<()> {
        let mut out = ArrayViewMut2::from_shape(self.probs.raw_dim(), outputs)?;
        out.assign(&self.probs);
        Ok(())
    }

    fn check_labels(&self, labels: &[f32]) -> Result<()> {
        if labels.len() != self.batch {
            return Err(MlErr::SizeMismatch {
                a: "labels",
                b: "batch",
                got: labels.len(),
                expected: self.batch,
            });
        }

        match labels.iter().find(|&&l| l < 0.0 || l as usize >= self.classes) {
            Some(&label) => Err(MlErr::LabelOutOfRange {
                label: label as usize,
                classes: self.classes,
            }),
            None => Ok(()),
        }
    }
}

impl Model for SoftmaxRegression {
    fn compile(&mut self, input_shape: &[usize], optimizer: OptimizerSpec, loss: LossFnSpec) -> Result<()> {
        let Some((&batch, rest)) = input_shape.split_first() else {
            return Err(MlErr::InvalidParameter {
                what: "input_shape",
                detail: "the shape has no dimensions".into(),
            });
        };

        let features: usize = rest.iter().product();
        if batch == 0 || features == 0 || self.classes == 0 {
            return Err(MlErr::InvalidParameter {
                what: "input_shape",
                detail: format!("{input_shape:?} with {} classes", self.classes),
            });
        }

        match loss {
            LossFnSpec::CategoricalCrossEntropy => self.loss_fn = CategoricalCrossEntropy::new(),
        }

        self.batch = batch;
        self.dim = (features, self.classes);

        let std = (1.0 / features as f32).sqrt();
        let normal = Normal::new(0.0, std).map_err(|e| MlErr::InvalidParameter {
            what: "weight initialization",
            detail: e.to_string(),
        })?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let weights = Array2::random_using(self.dim, normal, &mut rng);

        self.params = weights
            .iter()
            .copied()
            .chain(std::iter::repeat_n(0.0, self.classes))
            .collect();
        self.grad = vec![0.0; self.size()];
        self.optimizer = Some(Sgd::new(optimizer, self.size()));
        self.probs = Array2::zeros((batch, self.classes));
        Ok(())
    }

    fn fit(&mut self, inputs: &[f32], labels: &[f32], outputs: &mut [f32]) -> Result<()> {
        self.forward(inputs)?;
        self.check_labels(labels)?;

        let x = ArrayView2::from_shape((self.batch, self.dim.0), inputs)?;
        let y = ArrayView2::from_shape((self.batch, 1), labels)?;

        let loss = self.loss_fn.loss(self.probs.view(), y);
        let d = self.loss_fn.loss_prime(self.probs.view(), y);

        let (mut dw, mut db) = view_grad(self.dim, &mut self.grad)?;
        linalg::general_mat_mul(1.0, &x.t(), &d, 0.0, &mut dw);
        db.assign(&d.sum_axis(Axis(0)));

        let optimizer = self.optimizer.as_mut().ok_or(MlErr::NotCompiled)?;
        optimizer.update_params(&mut self.params, &self.grad);

        trace!(loss = loss; "fit step");
        self.write_outputs(outputs)
    }

    fn evaluate(&mut self, inputs: &[f32], outputs: &mut [f32]) -> Result<()> {
        self.forward(inputs)?;
        self.write_outputs(outputs)
    }

    fn set_minimizer(&mut self, optimizer: OptimizerSpec) -> Result<()> {
        self.optimizer
            .as_mut()
            .ok_or(MlErr::NotCompiled)?
            .reconfigure(optimizer);
        Ok(())
    }

    fn write_dot(&self, w: &mut dyn io::Write) -> io::Result<()> {
        writeln!(w, "digraph softmax_regression {{")?;
        writeln!(w, "  input [label=\"input ({}x{})\"];", self.batch, self.dim.0)?;
        writeln!(w, "  dense [label=\"dense ({}x{})\"];", self.dim.0, self.dim.1)?;
        writeln!(w, "  softmax [label=\"softmax ({})\"];", self.dim.1)?;
        writeln!(w, "  input -> dense -> softmax;")?;
        writeln!(w, "}}")
    }
}

/// Gives a view of the raw parameter slice as the weights and biases.
fn view_params(dim: (usize, usize), params: &[f32]) -> Result<(ArrayView2<'_, f32>, ArrayView1<'_, f32>)> {
    let (w_raw, b_raw) = params.split_at(dim.0 * dim.1);
    let weights = ArrayView2::from_shape(dim, w_raw)?;
    let biases = ArrayView1::from_shape(dim.1, b_raw)?;
    Ok((weights, biases))
}

/// Gives a view of the raw gradient slice as the delta weights and delta biases.
fn view_grad(
    dim: (usize, usize),
    grad: &mut [f32],
) -> Result<(ArrayViewMut2<'_, f32>, ArrayViewMut1<'_, f32>)> {
    let (dw_raw, db_raw) = grad.split_at_mut(dim.0 * dim.1);
    let dw = ArrayViewMut2::from_shape(dim, dw_raw)?;
    let db = ArrayViewMut1::from_shape(dim.1, db_raw)?;
    Ok((dw, db))
}
