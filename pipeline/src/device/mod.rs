//! Host emulation of an accelerator: tensors tagged with where they live,
//! ordered command streams, and copies between tensors.
//!
//! Streams run their commands on a dedicated thread each, in submission
//! order, so work issued on different streams overlaps with each other and
//! with the host thread that issued it.

mod stream;
mod tensor;
mod transfer;

pub use stream::Stream;
pub use tensor::{Placement, Tensor, TensorParam};
pub use transfer::transfer;
