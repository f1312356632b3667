//! Tape-based autograd engine
//!
//! Every differentiable op records a [`BackwardOp`] on its result. Calling
//! [`backward`] on a loss walks the recorded graph once in reverse
//! topological order and accumulates gradients into the leaves:
//!
//! ```ignore
//! use boceto::autograd::{backward, mean, square, Tensor};
//!
//! let w = Tensor::from_vec(vec![0.5, -1.0], true);
//! let loss = mean(&square(&w));
//! backward(&loss, None);
//! assert!(w.grad().is_some());
//! ```

mod backward;
mod context;
mod ops;
pub mod precision;
mod tensor;

#[cfg(test)]
pub(crate) mod tests;

pub use backward::{backward, BackwardOp};
pub use context::{is_grad_enabled, no_grad, Context, ForwardMode};
pub use ops::*;
pub(crate) use ops::sigmoid_scalar;
pub use precision::{
    GradScaler, GradientScaler, MixedPrecisionConfig, NoopScaler, Precision,
};
pub(crate) use tensor::GradCell;
pub use tensor::Tensor;
