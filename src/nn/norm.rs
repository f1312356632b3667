//! Batch normalization layer

use super::Module;
use crate::autograd::{batch_norm2d, batch_norm2d_frozen, ForwardMode};
use crate::Tensor;
use ndarray::Array1;
use std::cell::RefCell;

/// Per-channel batch normalization over `[N, C, H, W]`
///
/// In `Training` mode normalises with the batch's statistics and folds them
/// into the running estimates; other modes use the running estimates.
pub struct BatchNorm2d {
    pub gamma: Tensor,
    pub beta: Tensor,
    running_mean: RefCell<Array1<f32>>,
    running_var: RefCell<Array1<f32>>,
    momentum: f32,
    eps: f32,
}

impl BatchNorm2d {
    pub fn new(channels: usize) -> Self {
        Self {
            gamma: Tensor::ones(&[channels], true),
            beta: Tensor::zeros(&[channels], true),
            running_mean: RefCell::new(Array1::zeros(channels)),
            running_var: RefCell::new(Array1::ones(channels)),
            momentum: 0.1,
            eps: 1e-5,
        }
    }

    pub fn forward(&self, x: &Tensor, mode: ForwardMode) -> Tensor {
        if !mode.uses_batch_statistics() {
            return batch_norm2d_frozen(
                x,
                &self.gamma,
                &self.beta,
                &self.running_mean.borrow(),
                &self.running_var.borrow(),
                self.eps,
            );
        }

        let (y, moments) = batch_norm2d(x, &self.gamma, &self.beta, self.eps);
        // Running variance tracks the unbiased estimate
        let correction = if moments.count > 1 {
            moments.count as f32 / (moments.count - 1) as f32
        } else {
            1.0
        };
        let m = self.momentum;
        self.running_mean.borrow_mut().zip_mut_with(&moments.mean, |r, &b| {
            *r = (1.0 - m) * *r + m * b;
        });
        self.running_var.borrow_mut().zip_mut_with(&moments.variance, |r, &b| {
            *r = (1.0 - m) * *r + m * b * correction;
        });
        y
    }

    pub fn running_mean(&self) -> Array1<f32> {
        self.running_mean.borrow().clone()
    }

    pub fn running_var(&self) -> Array1<f32> {
        self.running_var.borrow().clone()
    }
}

impl Module for BatchNorm2d {
    fn named_parameters(&self) -> Vec<(String, &Tensor)> {
        vec![("weight".into(), &self.gamma), ("bias".into(), &self.beta)]
    }

    fn named_parameters_mut(&mut self) -> Vec<(String, &mut Tensor)> {
        vec![("weight".into(), &mut self.gamma), ("bias".into(), &mut self.beta)]
    }

    fn named_buffers(&self) -> Vec<(String, Array1<f32>)> {
        vec![
            ("running_mean".into(), self.running_mean()),
            ("running_var".into(), self.running_var()),
        ]
    }

    fn named_buffers_mut(&mut self) -> Vec<(String, &mut Array1<f32>)> {
        vec![
            ("running_mean".into(), self.running_mean.get_mut()),
            ("running_var".into(), self.running_var.get_mut()),
        ]
    }
}
