//! Basic autograd operations: add, sub, mul, scale, sum, mean, abs, square

use crate::autograd::context::is_grad_enabled;
use crate::autograd::tensor::GradCell;
use crate::autograd::{BackwardOp, Tensor};
use ndarray::{ArrayD, IxDyn};
use std::rc::Rc;

fn scalar(value: f32) -> ArrayD<f32> {
    ArrayD::from_elem(IxDyn(&[1]), value)
}

fn assert_same_shape(a: &Tensor, b: &Tensor, op: &str) {
    assert_eq!(a.shape(), b.shape(), "{op}: operand shapes must match");
}

/// Add two tensors of the same shape
pub fn add(a: &Tensor, b: &Tensor) -> Tensor {
    assert_same_shape(a, b, "add");
    let data = a.data() + b.data();
    let requires_grad = is_grad_enabled() && (a.requires_grad() || b.requires_grad());

    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(AddBackward {
            a: a.clone(),
            b: b.clone(),
            sign_b: 1.0,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

/// Subtract `b` from `a`
pub fn sub(a: &Tensor, b: &Tensor) -> Tensor {
    assert_same_shape(a, b, "sub");
    let data = a.data() - b.data();
    let requires_grad = is_grad_enabled() && (a.requires_grad() || b.requires_grad());

    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(AddBackward {
            a: a.clone(),
            b: b.clone(),
            sign_b: -1.0,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct AddBackward {
    a: Tensor,
    b: Tensor,
    sign_b: f32,
    result_grad: GradCell,
}

impl BackwardOp for AddBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                self.a.accumulate_grad(grad.clone());
            }
            if self.b.requires_grad() {
                self.b.accumulate_grad(grad * self.sign_b);
            }
        }
    }

    fn inputs(&self) -> Vec<&Tensor> {
        vec![&self.a, &self.b]
    }
}

/// Multiply two tensors element-wise
pub fn mul(a: &Tensor, b: &Tensor) -> Tensor {
    assert_same_shape(a, b, "mul");
    let data = a.data() * b.data();
    let requires_grad = is_grad_enabled() && (a.requires_grad() || b.requires_grad());

    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(MulBackward {
            a: a.clone(),
            b: b.clone(),
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct MulBackward {
    a: Tensor,
    b: Tensor,
    result_grad: GradCell,
}

impl BackwardOp for MulBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                // ∂L/∂a = ∂L/∂out * b
                self.a.accumulate_grad(grad * self.b.data());
            }
            if self.b.requires_grad() {
                // ∂L/∂b = ∂L/∂out * a
                self.b.accumulate_grad(grad * self.a.data());
            }
        }
    }

    fn inputs(&self) -> Vec<&Tensor> {
        vec![&self.a, &self.b]
    }
}

/// Scale tensor by a scalar
pub fn scale(a: &Tensor, factor: f32) -> Tensor {
    let data = a.data() * factor;
    let requires_grad = is_grad_enabled() && a.requires_grad();

    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(ScaleBackward {
            a: a.clone(),
            factor,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct ScaleBackward {
    a: Tensor,
    factor: f32,
    result_grad: GradCell,
}

impl BackwardOp for ScaleBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                self.a.accumulate_grad(grad * self.factor);
            }
        }
    }

    fn inputs(&self) -> Vec<&Tensor> {
        vec![&self.a]
    }
}

/// Add a scalar to every element
pub fn add_scalar(a: &Tensor, value: f32) -> Tensor {
    let data = a.data() + value;
    let requires_grad = is_grad_enabled() && a.requires_grad();

    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        // Gradient passes through unchanged
        let backward_op = Rc::new(ScaleBackward {
            a: a.clone(),
            factor: 1.0,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

/// Sum all elements into a one-element tensor
pub fn sum(a: &Tensor) -> Tensor {
    reduce(a, 1.0)
}

/// Mean of all elements into a one-element tensor
pub fn mean(a: &Tensor) -> Tensor {
    let n = a.len().max(1) as f32;
    reduce(a, 1.0 / n)
}

fn reduce(a: &Tensor, weight: f32) -> Tensor {
    let data = scalar(a.data().sum() * weight);
    let requires_grad = is_grad_enabled() && a.requires_grad();

    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(ReduceBackward {
            a: a.clone(),
            weight,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct ReduceBackward {
    a: Tensor,
    weight: f32,
    result_grad: GradCell,
}

impl BackwardOp for ReduceBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                // ∂L/∂a_i = ∂L/∂out * weight (broadcast)
                let upstream = grad.iter().next().copied().unwrap_or(0.0);
                let grad_a = ArrayD::from_elem(self.a.data().raw_dim(), upstream * self.weight);
                self.a.accumulate_grad(grad_a);
            }
        }
    }

    fn inputs(&self) -> Vec<&Tensor> {
        vec![&self.a]
    }
}

/// Element-wise absolute value
pub fn abs(a: &Tensor) -> Tensor {
    map_unary(a, f32::abs, |x, _| {
        if x > 0.0 {
            1.0
        } else if x < 0.0 {
            -1.0
        } else {
            0.0
        }
    })
}

/// Element-wise square
pub fn square(a: &Tensor) -> Tensor {
    map_unary(a, |x| x * x, |x, _| 2.0 * x)
}

/// Element-wise op whose derivative depends on the input `x` and output `y`
pub(crate) fn map_unary(
    a: &Tensor,
    f: impl Fn(f32) -> f32,
    df: fn(f32, f32) -> f32,
) -> Tensor {
    let data = a.data().mapv(f);
    let requires_grad = is_grad_enabled() && a.requires_grad();

    let output = if requires_grad { Some(data.clone()) } else { None };
    let mut result = Tensor::new(data, requires_grad);

    if let Some(output) = output {
        let backward_op = Rc::new(UnaryBackward {
            a: a.clone(),
            output,
            df,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct UnaryBackward {
    a: Tensor,
    output: ArrayD<f32>,
    df: fn(f32, f32) -> f32,
    result_grad: GradCell,
}

impl BackwardOp for UnaryBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                let mut grad_a = grad.clone();
                ndarray::Zip::from(&mut grad_a)
                    .and(self.a.data())
                    .and(&self.output)
                    .for_each(|g, &x, &y| *g *= (self.df)(x, y));
                self.a.accumulate_grad(grad_a);
            }
        }
    }

    fn inputs(&self) -> Vec<&Tensor> {
        vec![&self.a]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autograd::backward;
    use approx::assert_relative_eq;

    #[test]
    fn test_sub_gradient_signs() {
        let a = Tensor::from_vec(vec![1.0, 2.0], true);
        let b = Tensor::from_vec(vec![0.5, 0.5], true);
        let y = sum(&sub(&a, &b));
        backward(&y, None);
        assert_eq!(a.grad().unwrap().iter().copied().collect::<Vec<f32>>(), vec![1.0, 1.0]);
        assert_eq!(b.grad().unwrap().iter().copied().collect::<Vec<f32>>(), vec![-1.0, -1.0]);
    }

    #[test]
    fn test_mean_value_and_gradient() {
        let a = Tensor::from_vec(vec![1.0, 2.0, 3.0, 6.0], true);
        let y = mean(&a);
        assert_relative_eq!(y.item(), 3.0);
        backward(&y, None);
        for g in a.grad().unwrap().iter() {
            assert_relative_eq!(*g, 0.25);
        }
    }

    #[test]
    fn test_abs_gradient_at_zero_is_zero() {
        let a = Tensor::from_vec(vec![-2.0, 0.0, 3.0], true);
        let y = sum(&abs(&a));
        assert_relative_eq!(y.item(), 5.0);
        backward(&y, None);
        assert_eq!(a.grad().unwrap().iter().copied().collect::<Vec<f32>>(), vec![-1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_square_gradient() {
        let a = Tensor::from_vec(vec![-1.5, 2.0], true);
        let y = sum(&square(&a));
        backward(&y, None);
        assert_eq!(a.grad().unwrap().iter().copied().collect::<Vec<f32>>(), vec![-3.0, 4.0]);
    }

    #[test]
    fn test_add_scalar_passes_gradient() {
        let a = Tensor::from_vec(vec![1.0], true);
        let y = add_scalar(&a, 10.0);
        assert_relative_eq!(y.item(), 11.0);
        backward(&y, None);
        assert_eq!(a.grad().unwrap().iter().copied().collect::<Vec<f32>>(), vec![1.0]);
    }

    #[test]
    fn test_no_grad_records_nothing() {
        let a = Tensor::from_vec(vec![1.0, 2.0], true);
        let y = crate::autograd::no_grad(|| scale(&a, 2.0));
        assert!(!y.requires_grad());
        assert!(y.backward_op().is_none());
    }

    #[test]
    #[should_panic(expected = "operand shapes must match")]
    fn test_add_shape_mismatch_panics() {
        let a = Tensor::zeros(&[2], false);
        let b = Tensor::zeros(&[3], false);
        let _ = add(&a, &b);
    }
}
