//! Batch data structure

use crate::Tensor;

/// A training batch of image pairs
#[derive(Clone)]
pub struct Batch {
    /// Conditioning images `[N, 3, H, W]`
    pub inputs: Tensor,
    /// Ground-truth translations `[N, 3, H, W]`
    pub targets: Tensor,
}

impl Batch {
    pub fn new(inputs: Tensor, targets: Tensor) -> Self {
        Self { inputs, targets }
    }

    /// Number of pairs
    pub fn size(&self) -> usize {
        self.inputs.shape().first().copied().unwrap_or(0)
    }
}
