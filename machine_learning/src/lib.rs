pub mod arch;
pub mod augment;
pub mod batch;
pub mod dataset;
pub mod error;
pub mod optimization;
pub mod specs;
pub mod synthetic;

pub use dataset::{CHANNELS, Dataset, IMAGE_LEN, IMAGE_SIDE, LabeledSample, NUM_CLASSES};
pub use error::{MlErr, Result};
