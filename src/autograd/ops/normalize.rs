//! Normalization autograd operations: batch_norm2d, normalize_channels

use crate::autograd::context::is_grad_enabled;
use crate::autograd::tensor::GradCell;
use crate::autograd::{BackwardOp, Tensor};
use ndarray::{Array1, ArrayD, Axis, Ix4};
use std::rc::Rc;

/// Per-channel statistics of one batch, used to update running estimates
#[derive(Debug, Clone)]
pub struct BatchMoments {
    pub mean: Array1<f32>,
    /// Biased variance (divides by element count)
    pub variance: Array1<f32>,
    /// Elements per channel (`N * H * W`)
    pub count: usize,
}

/// Batch normalization over `[N, C, H, W]` using the batch's own statistics
///
/// y = gamma * (x - mean_c) / sqrt(var_c + epsilon) + beta
pub fn batch_norm2d(
    x: &Tensor,
    gamma: &Tensor,
    beta: &Tensor,
    epsilon: f32,
) -> (Tensor, BatchMoments) {
    let xv = x.data().view().into_dimensionality::<Ix4>().expect("batch_norm2d input is 4-D");
    let channels = xv.dim().1;
    let count = xv.len() / channels.max(1);

    let mut mean = Array1::zeros(channels);
    let mut variance = Array1::zeros(channels);
    let mut normalized = xv.to_owned();
    let mut output = xv.to_owned();
    let mut inv_std = Array1::zeros(channels);

    for c in 0..channels {
        let plane = xv.index_axis(Axis(1), c);
        let m = plane.sum() / count as f32;
        let v = plane.mapv(|val| (val - m).powi(2)).sum() / count as f32;
        let is = 1.0 / (v + epsilon).sqrt();
        mean[c] = m;
        variance[c] = v;
        inv_std[c] = is;

        let g = gamma.data()[c];
        let b = beta.data()[c];
        normalized.index_axis_mut(Axis(1), c).mapv_inplace(|val| (val - m) * is);
        let xhat = normalized.index_axis(Axis(1), c);
        output.index_axis_mut(Axis(1), c).zip_mut_with(&xhat, |o, &nv| *o = g * nv + b);
    }

    let requires_grad =
        is_grad_enabled() && (x.requires_grad() || gamma.requires_grad() || beta.requires_grad());
    let mut result = Tensor::new(output.into_dyn(), requires_grad);

    if requires_grad {
        let backward_op = Rc::new(BatchNormBackward {
            x: x.clone(),
            gamma: gamma.clone(),
            beta: beta.clone(),
            normalized: normalized.into_dyn(),
            inv_std,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    (result, BatchMoments { mean, variance, count })
}

struct BatchNormBackward {
    x: Tensor,
    gamma: Tensor,
    beta: Tensor,
    normalized: ArrayD<f32>,
    inv_std: Array1<f32>,
    result_grad: GradCell,
}

impl BackwardOp for BatchNormBackward {
    fn backward(&self) {
        let grad_ref = self.result_grad.borrow();
        let Some(grad) = grad_ref.as_ref() else { return };

        let channels = self.inv_std.len();
        let count = (grad.len() / channels.max(1)) as f32;
        let mut grad_x = ArrayD::zeros(grad.raw_dim());
        let mut grad_gamma = Array1::zeros(channels);
        let mut grad_beta = Array1::zeros(channels);

        for c in 0..channels {
            let g = grad.index_axis(Axis(1), c);
            let xhat = self.normalized.index_axis(Axis(1), c);
            // ∂L/∂beta = Σ g, ∂L/∂gamma = Σ g * x̂
            let sum_g = g.sum();
            let sum_g_xhat = (&g * &xhat).sum();
            grad_beta[c] = sum_g;
            grad_gamma[c] = sum_g_xhat;

            // ∂L/∂x = gamma * inv_std / M * (M * g - Σg - x̂ * Σ(g * x̂))
            let coeff = self.gamma.data()[c] * self.inv_std[c] / count;
            let mut gx = grad_x.index_axis_mut(Axis(1), c);
            ndarray::Zip::from(&mut gx).and(&g).and(&xhat).for_each(|dx, &gv, &xh| {
                *dx = coeff * (count * gv - sum_g - xh * sum_g_xhat);
            });
        }

        if self.x.requires_grad() {
            self.x.accumulate_grad(grad_x);
        }
        if self.gamma.requires_grad() {
            self.gamma.accumulate_grad(grad_gamma.into_dyn());
        }
        if self.beta.requires_grad() {
            self.beta.accumulate_grad(grad_beta.into_dyn());
        }
    }

    fn inputs(&self) -> Vec<&Tensor> {
        vec![&self.x, &self.gamma, &self.beta]
    }
}

/// Batch normalization with fixed (running) statistics: a per-channel affine map
pub fn batch_norm2d_frozen(
    x: &Tensor,
    gamma: &Tensor,
    beta: &Tensor,
    running_mean: &Array1<f32>,
    running_var: &Array1<f32>,
    epsilon: f32,
) -> Tensor {
    let channels = running_mean.len();
    let inv_std: Array1<f32> = running_var.mapv(|v| 1.0 / (v + epsilon).sqrt());
    let mut normalized = x.data().clone();
    let mut output = x.data().clone();

    for c in 0..channels {
        let m = running_mean[c];
        let is = inv_std[c];
        let g = gamma.data()[c];
        let b = beta.data()[c];
        normalized.index_axis_mut(Axis(1), c).mapv_inplace(|val| (val - m) * is);
        output.index_axis_mut(Axis(1), c).mapv_inplace(|val| g * (val - m) * is + b);
    }

    let requires_grad =
        is_grad_enabled() && (x.requires_grad() || gamma.requires_grad() || beta.requires_grad());
    let mut result = Tensor::new(output, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(FrozenNormBackward {
            x: x.clone(),
            gamma: gamma.clone(),
            beta: beta.clone(),
            normalized,
            inv_std,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct FrozenNormBackward {
    x: Tensor,
    gamma: Tensor,
    beta: Tensor,
    normalized: ArrayD<f32>,
    inv_std: Array1<f32>,
    result_grad: GradCell,
}

impl BackwardOp for FrozenNormBackward {
    fn backward(&self) {
        let grad_ref = self.result_grad.borrow();
        let Some(grad) = grad_ref.as_ref() else { return };

        let channels = self.inv_std.len();
        let mut grad_x = grad.clone();
        let mut grad_gamma = Array1::zeros(channels);
        let mut grad_beta = Array1::zeros(channels);

        for c in 0..channels {
            let g = grad.index_axis(Axis(1), c);
            grad_beta[c] = g.sum();
            grad_gamma[c] = (&g * &self.normalized.index_axis(Axis(1), c)).sum();
            let factor = self.gamma.data()[c] * self.inv_std[c];
            grad_x.index_axis_mut(Axis(1), c).mapv_inplace(|v| v * factor);
        }

        if self.x.requires_grad() {
            self.x.accumulate_grad(grad_x);
        }
        if self.gamma.requires_grad() {
            self.gamma.accumulate_grad(grad_gamma.into_dyn());
        }
        if self.beta.requires_grad() {
            self.beta.accumulate_grad(grad_beta.into_dyn());
        }
    }

    fn inputs(&self) -> Vec<&Tensor> {
        vec![&self.x, &self.gamma, &self.beta]
    }
}

/// Scale every spatial position of `[N, C, H, W]` to unit L2 norm across channels
///
/// y_c = x_c / (‖x‖ + epsilon)
pub fn normalize_channels(x: &Tensor, epsilon: f32) -> Tensor {
    let norms = x.data().mapv(|v| v * v).sum_axis(Axis(1)).mapv(f32::sqrt);
    let denom = norms.mapv(|n| n + epsilon).insert_axis(Axis(1));
    let data = x.data() / &denom;

    let requires_grad = is_grad_enabled() && x.requires_grad();
    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(NormalizeChannelsBackward {
            x: x.clone(),
            norms: norms.insert_axis(Axis(1)),
            epsilon,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct NormalizeChannelsBackward {
    x: Tensor,
    /// ‖x‖ with a singleton channel axis for broadcasting
    norms: ArrayD<f32>,
    epsilon: f32,
    result_grad: GradCell,
}

impl BackwardOp for NormalizeChannelsBackward {
    fn backward(&self) {
        let grad_ref = self.result_grad.borrow();
        let Some(grad) = grad_ref.as_ref() else { return };
        if !self.x.requires_grad() {
            return;
        }

        // ∂L/∂x_c = g_c / d - x_c * Σ_k(g_k x_k) / (d² ‖x‖), d = ‖x‖ + ε
        let x = self.x.data();
        let dot = (grad * x).sum_axis(Axis(1)).insert_axis(Axis(1));
        let denom = self.norms.mapv(|n| n + self.epsilon);
        let mut coeff = dot.clone();
        ndarray::Zip::from(&mut coeff).and(&self.norms).and(&denom).for_each(|c, &n, &d| {
            *c = if n > 0.0 { *c / (d * d * n) } else { 0.0 };
        });
        let grad_x = grad / &denom - &(x * &coeff);
        self.x.accumulate_grad(grad_x);
    }

    fn inputs(&self) -> Vec<&Tensor> {
        vec![&self.x]
    }
}
