//! Shape operations: concat_channels

use crate::autograd::context::is_grad_enabled;
use crate::autograd::tensor::GradCell;
use crate::autograd::{BackwardOp, Tensor};
use ndarray::{concatenate, Axis, Slice};
use std::rc::Rc;

/// Concatenate `[N, C_a, H, W]` and `[N, C_b, H, W]` into `[N, C_a + C_b, H, W]`
///
/// # Panics
///
/// Panics if batch or spatial dimensions differ.
pub fn concat_channels(a: &Tensor, b: &Tensor) -> Tensor {
    let (sa, sb) = (a.shape(), b.shape());
    assert!(
        sa.len() == 4 && sb.len() == 4 && sa[0] == sb[0] && sa[2..] == sb[2..],
        "concat_channels: incompatible shapes {sa:?} and {sb:?}"
    );
    let split = sa[1];
    let data = concatenate(Axis(1), &[a.data().view(), b.data().view()])
        .expect("concat_channels: shapes checked above");

    let requires_grad = is_grad_enabled() && (a.requires_grad() || b.requires_grad());
    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(ConcatBackward {
            a: a.clone(),
            b: b.clone(),
            split,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct ConcatBackward {
    a: Tensor,
    b: Tensor,
    split: usize,
    result_grad: GradCell,
}

impl BackwardOp for ConcatBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                let part = grad.slice_axis(Axis(1), Slice::from(..self.split));
                self.a.accumulate_grad(part.to_owned());
            }
            if self.b.requires_grad() {
                let part = grad.slice_axis(Axis(1), Slice::from(self.split..));
                self.b.accumulate_grad(part.to_owned());
            }
        }
    }

    fn inputs(&self) -> Vec<&Tensor> {
        vec![&self.a, &self.b]
    }
}
