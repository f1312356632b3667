//! Neural network layers built on the autograd ops

mod conv;
mod dropout;
mod init;
mod module;
mod norm;

pub use conv::{Conv2d, ConvTranspose2d};
pub use dropout::Dropout;
pub use init::{init_rng, kaiming_uniform};
pub use module::{prefixed, Module};
pub use norm::BatchNorm2d;
