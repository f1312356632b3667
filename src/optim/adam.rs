//! Adam optimizer

use super::Optimizer;
use crate::Tensor;
use ndarray::ArrayD;

/// Adam optimizer
///
/// m_t = β1 * m_{t-1} + (1 - β1) * g
/// v_t = β2 * v_{t-1} + (1 - β2) * g²
/// θ_t = θ_{t-1} - lr * √(1 - β2^t) / (1 - β1^t) * m_t / (√v_t + ε)
#[derive(Debug, Clone)]
pub struct Adam {
    lr: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    t: u64,
    m: Vec<Option<ArrayD<f32>>>,
    v: Vec<Option<ArrayD<f32>>>,
}

impl Adam {
    pub fn new(lr: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self { lr, beta1, beta2, epsilon, t: 0, m: Vec::new(), v: Vec::new() }
    }

    /// Adam with β = (0.9, 0.999), ε = 1e-8
    pub fn default_params(lr: f32) -> Self {
        Self::new(lr, 0.9, 0.999, 1e-8)
    }

    // Checkpoint state accessors

    /// Number of steps taken
    #[must_use]
    pub fn step_count(&self) -> u64 {
        self.t
    }

    /// Set step counter (for checkpoint resume)
    pub fn set_step_count(&mut self, t: u64) {
        self.t = t;
    }

    /// First moment buffers, by parameter position
    #[must_use]
    pub fn first_moments(&self) -> &[Option<ArrayD<f32>>] {
        &self.m
    }

    /// Second moment buffers, by parameter position
    #[must_use]
    pub fn second_moments(&self) -> &[Option<ArrayD<f32>>] {
        &self.v
    }

    pub fn set_first_moment(&mut self, idx: usize, data: ArrayD<f32>) {
        if idx >= self.m.len() {
            self.m.resize(idx + 1, None);
        }
        self.m[idx] = Some(data);
    }

    pub fn set_second_moment(&mut self, idx: usize, data: ArrayD<f32>) {
        if idx >= self.v.len() {
            self.v.resize(idx + 1, None);
        }
        self.v[idx] = Some(data);
    }

    #[must_use]
    pub fn betas(&self) -> (f32, f32) {
        (self.beta1, self.beta2)
    }
}

impl Optimizer for Adam {
    fn step(&mut self, params: &mut [&mut Tensor]) {
        if self.m.len() < params.len() {
            self.m.resize(params.len(), None);
            self.v.resize(params.len(), None);
        }
        self.t += 1;

        let t = self.t as i32;
        let lr_t = self.lr * (1.0 - self.beta2.powi(t)).sqrt() / (1.0 - self.beta1.powi(t));

        for (i, param) in params.iter_mut().enumerate() {
            let Some(grad) = param.grad() else { continue };

            let m_t = match &self.m[i] {
                Some(m) if m.shape() == grad.shape() => m * self.beta1 + &grad * (1.0 - self.beta1),
                _ => &grad * (1.0 - self.beta1),
            };
            let grad_sq = &grad * &grad;
            let v_t = match &self.v[i] {
                Some(v) if v.shape() == grad.shape() => {
                    v * self.beta2 + &grad_sq * (1.0 - self.beta2)
                }
                _ => grad_sq * (1.0 - self.beta2),
            };

            let update = &m_t / &(v_t.mapv(f32::sqrt) + self.epsilon) * lr_t;
            let updated = param.data() - &update;
            *param.data_mut() = updated;

            self.m[i] = Some(m_t);
            self.v[i] = Some(v_t);
        }
    }

    fn lr(&self) -> f32 {
        self.lr
    }

    fn set_lr(&mut self, lr: f32) {
        self.lr = lr;
    }
}
