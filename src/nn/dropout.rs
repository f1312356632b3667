//! Dropout layer

use crate::autograd::{dropout, Context};
use crate::Tensor;

/// Inverted dropout, active in training and sampling modes
#[derive(Debug, Clone, Copy)]
pub struct Dropout {
    pub p: f32,
}

impl Dropout {
    pub fn new(p: f32) -> Self {
        Self { p }
    }

    pub fn forward(&self, x: &Tensor, ctx: &mut Context) -> Tensor {
        dropout(x, self.p, ctx)
    }
}

impl Default for Dropout {
    fn default() -> Self {
        Self::new(0.5)
    }
}
