//! Autograd operations with backward passes

mod activations;
mod basic;
mod conv;
mod dropout;
mod normalize;
mod shape;

pub use activations::{leaky_relu, relu, sigmoid, tanh};
pub(crate) use activations::sigmoid_scalar;
pub use basic::{abs, add, add_scalar, mean, mul, scale, square, sub, sum};
pub use conv::{conv2d, conv_transpose2d, ConvGeometry, PaddingMode};
pub use dropout::dropout;
pub use normalize::{batch_norm2d, batch_norm2d_frozen, normalize_channels, BatchMoments};
pub use shape::concat_channels;
