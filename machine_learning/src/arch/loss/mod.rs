mod cross_entropy;
mod loss_fn;

pub use cross_entropy::CategoricalCrossEntropy;
pub use loss_fn::LossFn;
