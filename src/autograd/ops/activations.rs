//! Activation function autograd operations: relu, leaky_relu, tanh, sigmoid

use super::basic::map_unary;
use crate::autograd::context::is_grad_enabled;
use crate::autograd::tensor::GradCell;
use crate::autograd::{BackwardOp, Tensor};
use std::rc::Rc;

/// ReLU activation
pub fn relu(a: &Tensor) -> Tensor {
    map_unary(a, |x| x.max(0.0), |x, _| if x > 0.0 { 1.0 } else { 0.0 })
}

/// Hyperbolic tangent; bounds output to [-1, 1]
pub fn tanh(a: &Tensor) -> Tensor {
    // ∂tanh/∂x = 1 - tanh²(x)
    map_unary(a, f32::tanh, |_, y| 1.0 - y * y)
}

/// Numerically stable sigmoid
pub fn sigmoid(a: &Tensor) -> Tensor {
    map_unary(a, sigmoid_scalar, |_, y| y * (1.0 - y))
}

pub(crate) fn sigmoid_scalar(v: f32) -> f32 {
    if v >= 0.0 {
        1.0 / (1.0 + (-v).exp())
    } else {
        let exp_v = v.exp();
        exp_v / (1.0 + exp_v)
    }
}

/// Leaky ReLU: `x` for positive inputs, `slope * x` otherwise
pub fn leaky_relu(a: &Tensor, slope: f32) -> Tensor {
    let data = a.data().mapv(|x| if x > 0.0 { x } else { slope * x });
    let requires_grad = is_grad_enabled() && a.requires_grad();

    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(LeakyReluBackward {
            a: a.clone(),
            slope,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct LeakyReluBackward {
    a: Tensor,
    slope: f32,
    result_grad: GradCell,
}

impl BackwardOp for LeakyReluBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                let mut grad_a = grad.clone();
                ndarray::Zip::from(&mut grad_a).and(self.a.data()).for_each(|g, &x| {
                    if x <= 0.0 {
                        *g *= self.slope;
                    }
                });
                self.a.accumulate_grad(grad_a);
            }
        }
    }

    fn inputs(&self) -> Vec<&Tensor> {
        vec![&self.a]
    }
}
