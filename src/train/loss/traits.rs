//! Loss function trait

use crate::Tensor;

/// Trait for loss functions
pub trait LossFn {
    /// Compute a one-element loss tensor wired into the autograd graph
    ///
    /// # Panics
    ///
    /// Panics if `predictions` and `targets` differ in shape; callers validate
    /// shapes first and surface a `ShapeMismatch` error.
    fn forward(&self, predictions: &Tensor, targets: &Tensor) -> Tensor;

    /// Name of the loss function
    fn name(&self) -> &str;
}
