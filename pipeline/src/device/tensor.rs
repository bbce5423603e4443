use std::{fmt, sync::Arc};

use parking_lot::{Mutex, MutexGuard};

use crate::{PipelineErr, Result};

/// Where a tensor's memory lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Pageable host memory.
    Host,
    /// Page locked host memory, the source and target of asynchronous copies.
    Pinned,
    /// Memory of the device with the given ordinal.
    Device(usize),
}

/// Shape and placement of a tensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorParam {
    pub placement: Placement,
    pub shape: Vec<usize>,
}

impl TensorParam {
    pub fn host(shape: &[usize]) -> Self {
        Self {
            placement: Placement::Host,
            shape: shape.to_vec(),
        }
    }

    pub fn device(ordinal: usize, shape: &[usize]) -> Self {
        Self {
            placement: Placement::Device(ordinal),
            shape: shape.to_vec(),
        }
    }

    /// Returns the amount of elements a tensor of this shape holds.
    #[inline]
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A handle to a zero initialized `f32` allocation.
///
/// Cloning the handle doesn't copy the data, both handles refer to the same
/// memory, which is released once the last handle is dropped. Commands queued
/// on a stream hold their own handles.
#[derive(Clone)]
pub struct Tensor {
    param: TensorParam,
    data: Arc<Mutex<Vec<f32>>>,
}

impl Tensor {
    /// Allocates a new tensor.
    ///
    /// # Arguments
    /// * `param` - The shape and placement of the tensor.
    ///
    /// # Returns
    /// A new zeroed `Tensor`.
    pub fn new(param: TensorParam) -> Self {
        let data = vec![0.0; param.len()];
        Self {
            param,
            data: Arc::new(Mutex::new(data)),
        }
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.param.shape
    }

    #[inline]
    pub fn placement(&self) -> Placement {
        self.param.placement
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.param.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.param.is_empty()
    }

    /// Page locks a host tensor so it can take part in asynchronous copies.
    ///
    /// # Returns
    /// An error if the tensor lives on a device.
    pub fn pin_memory(&mut self) -> Result<()> {
        match self.placement() {
            Placement::Host | Placement::Pinned => {
                self.param.placement = Placement::Pinned;
                Ok(())
            }
            Placement::Device(_) => Err(PipelineErr::PinnedDeviceMemory),
        }
    }

    /// Locks the tensor's memory for reading or writing.
    ///
    /// Blocks while a queued command is using it.
    #[inline]
    pub fn lock(&self) -> MutexGuard<'_, Vec<f32>> {
        self.data.lock()
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("placement", &self.param.placement)
            .field("shape", &self.param.shape)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_tensor_is_zeroed_with_its_shape() {
        let t = Tensor::new(TensorParam::device(0, &[4, 3, 2]));
        assert_eq!(t.len(), 24);
        assert_eq!(t.shape(), [4, 3, 2]);
        assert!(t.lock().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn clones_share_memory() {
        let a = Tensor::new(TensorParam::host(&[2]));
        let b = a.clone();
        a.lock()[1] = 5.0;
        assert_eq!(b.lock()[1], 5.0);
    }

    #[test]
    fn only_host_memory_can_be_pinned() {
        let mut host = Tensor::new(TensorParam::host(&[1]));
        host.pin_memory().unwrap();
        host.pin_memory().unwrap();
        assert_eq!(host.placement(), Placement::Pinned);

        let mut dev = Tensor::new(TensorParam::device(1, &[1]));
        assert!(matches!(dev.pin_memory(), Err(PipelineErr::PinnedDeviceMemory)));
    }
}
