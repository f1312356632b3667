//! Binary cross-entropy on raw logits
//!
//! Numerically stable form:
//! ```text
//! L_i = max(x_i, 0) - x_i * t_i + log(1 + exp(-|x_i|))
//! L = mean(L_i)
//! ```
//!
//! Gradient: `∂L/∂x_i = (σ(x_i) - t_i) / N`

use crate::autograd::{is_grad_enabled, sigmoid_scalar, BackwardOp};
use crate::Tensor;
use ndarray::{ArrayD, IxDyn};
use std::rc::Rc;

use super::LossFn;

/// Binary cross-entropy with logits, averaged over every element
///
/// The critic's patch map is scored element-wise against a constant label.
pub struct BCEWithLogitsLoss;

impl BCEWithLogitsLoss {
    /// max(x, 0) - x*t + log(1 + exp(-|x|))
    fn stable_bce(logit: f32, target: f32) -> f32 {
        logit.max(0.0) - logit * target + (-logit.abs()).exp().ln_1p()
    }

    /// Loss of every logit against the same label (1 = genuine, 0 = generated)
    pub fn against_label(&self, logits: &Tensor, label: f32) -> Tensor {
        self.forward(logits, &Tensor::full(logits.shape(), label, false))
    }
}

impl LossFn for BCEWithLogitsLoss {
    fn forward(&self, predictions: &Tensor, targets: &Tensor) -> Tensor {
        assert_eq!(
            predictions.shape(),
            targets.shape(),
            "Predictions and targets must have same shape"
        );

        let n = predictions.len().max(1) as f32;
        let total: f32 = predictions
            .data()
            .iter()
            .zip(targets.data().iter())
            .map(|(&logit, &target)| Self::stable_bce(logit, target))
            .sum();

        let requires_grad = is_grad_enabled() && predictions.requires_grad();
        let mut loss = Tensor::new(ArrayD::from_elem(IxDyn(&[1]), total / n), requires_grad);

        if requires_grad {
            let mut grad = predictions.data().mapv(sigmoid_scalar);
            grad.zip_mut_with(targets.data(), |g, &t| *g = (*g - t) / n);
            loss.set_backward_op(Rc::new(BCEBackward {
                predictions: predictions.clone(),
                grad,
                result_grad: loss.grad_cell(),
            }));
        }

        loss
    }

    fn name(&self) -> &'static str {
        "BCEWithLogits"
    }
}

struct BCEBackward {
    predictions: Tensor,
    /// ∂L/∂x for a unit upstream gradient
    grad: ArrayD<f32>,
    result_grad: crate::autograd::GradCell,
}

impl BackwardOp for BCEBackward {
    fn backward(&self) {
        if let Some(upstream) = self.result_grad.borrow().as_ref() {
            let factor = upstream.iter().next().copied().unwrap_or(0.0);
            self.predictions.accumulate_grad(&self.grad * factor);
        }
    }

    fn inputs(&self) -> Vec<&Tensor> {
        vec![&self.predictions]
    }
}
