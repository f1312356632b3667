//! Inverted dropout

use crate::autograd::context::{is_grad_enabled, Context};
use crate::autograd::tensor::GradCell;
use crate::autograd::{BackwardOp, Tensor};
use ndarray::ArrayD;
use rand::Rng;
use std::rc::Rc;

/// Zero each element with probability `p` and scale survivors by `1 / (1 - p)`
///
/// Identity when the context is not stochastic or `p == 0`.
pub fn dropout(x: &Tensor, p: f32, ctx: &mut Context) -> Tensor {
    if !ctx.mode().is_stochastic() || p <= 0.0 {
        return x.clone();
    }
    if p >= 1.0 {
        return Tensor::zeros(x.shape(), false);
    }

    let keep = 1.0 - p;
    let rng = ctx.rng_mut();
    let mask = x.data().mapv(|_| if rng.random::<f32>() < keep { 1.0 / keep } else { 0.0 });
    let data = x.data() * &mask;

    let requires_grad = is_grad_enabled() && x.requires_grad();
    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(DropoutBackward {
            x: x.clone(),
            mask,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct DropoutBackward {
    x: Tensor,
    mask: ArrayD<f32>,
    result_grad: GradCell,
}

impl BackwardOp for DropoutBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.x.requires_grad() {
                self.x.accumulate_grad(grad * &self.mask);
            }
        }
    }

    fn inputs(&self) -> Vec<&Tensor> {
        vec![&self.x]
    }
}
