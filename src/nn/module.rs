//! Parameter ownership trait shared by layers and models

use crate::Tensor;
use ndarray::Array1;

/// A component owning named trainable tensors and non-trainable buffers
///
/// Names are dotted paths (`down1.conv1.weight`) and stay stable across
/// versions: they are the keys of the checkpoint format.
pub trait Module {
    /// Trainable tensors in a fixed order
    fn named_parameters(&self) -> Vec<(String, &Tensor)>;

    /// Mutable view in the same order as `named_parameters`
    fn named_parameters_mut(&mut self) -> Vec<(String, &mut Tensor)>;

    /// Running statistics and other state updated outside the optimizer
    fn named_buffers(&self) -> Vec<(String, Array1<f32>)> {
        Vec::new()
    }

    fn named_buffers_mut(&mut self) -> Vec<(String, &mut Array1<f32>)> {
        Vec::new()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        self.named_parameters_mut().into_iter().map(|(_, t)| t).collect()
    }

    /// Total number of trainable scalars
    fn num_parameters(&self) -> usize {
        self.named_parameters().iter().map(|(_, t)| t.len()).sum()
    }

    /// Stop tracking gradients for every parameter
    fn freeze(&mut self) {
        for (_, param) in self.named_parameters_mut() {
            param.set_requires_grad(false);
        }
    }

    /// Drop gradients left by the previous backward pass
    fn zero_grad(&self) {
        for (_, param) in self.named_parameters() {
            param.zero_grad();
        }
    }
}

/// Prepend `prefix.` to every name
pub fn prefixed<'a, T: 'a>(prefix: &'a str, items: Vec<(String, T)>) -> impl Iterator<Item = (String, T)> + 'a {
    items.into_iter().map(move |(name, item)| (format!("{prefix}.{name}"), item))
}
