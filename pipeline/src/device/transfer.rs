use super::{Stream, Tensor};
use crate::{PipelineErr, Result};

/// Copies every tensor in `srcs` into the tensor at the same position in `dsts`.
///
/// With a stream the copies are queued on it and the call returns right away,
/// the tensors stay alive through the handles the queued command holds.
/// Without a stream the copies happen before returning.
///
/// # Arguments
/// * `srcs` - The tensors to read from.
/// * `dsts` - The tensors to write to, same count and sizes as `srcs`.
/// * `stream` - The stream to issue the copies on, if any.
///
/// # Returns
/// A shape mismatch error if the tensors don't pair up.
pub fn transfer(srcs: &[&Tensor], dsts: &[&Tensor], stream: Option<&Stream>) -> Result<()> {
    if srcs.len() != dsts.len() {
        return Err(PipelineErr::ShapeMismatch {
            what: "transfer count",
            got: vec![srcs.len()],
            expected: vec![dsts.len()],
        });
    }

    for (src, dst) in srcs.iter().zip(dsts) {
        if src.len() != dst.len() {
            return Err(PipelineErr::ShapeMismatch {
                what: "transfer",
                got: src.shape().to_vec(),
                expected: dst.shape().to_vec(),
            });
        }
    }

    let pairs: Vec<(Tensor, Tensor)> = srcs
        .iter()
        .zip(dsts)
        .map(|(&src, &dst)| (src.clone(), dst.clone()))
        .collect();

    match stream {
        Some(stream) => stream.submit(move || {
            copy_all(&pairs);
            Ok(())
        }),
        None => {
            copy_all(&pairs);
            Ok(())
        }
    }
}

fn copy_all(pairs: &[(Tensor, Tensor)]) {
    for (src, dst) in pairs {
        let src = src.lock();
        dst.lock().copy_from_slice(&src);
    }
}
