pub mod loss;
mod model;
mod softmax;

pub use model::Model;
pub use softmax::SoftmaxRegression;
