//! Gradient scalers for mixed-precision training.

use super::conversions::round_trip;
use super::{MixedPrecisionConfig, Precision};
use crate::autograd::{scale, Tensor};
use crate::optim::Optimizer;

/// Loss scaling around an optimizer step
///
/// One iteration is `scale` → backward → `step` → `update`. `step` returns
/// whether the optimizer actually ran.
pub trait GradientScaler {
    /// Multiply the loss by the current scale
    fn scale(&self, loss: &Tensor) -> Tensor;

    /// Unscale gradients and step the optimizer unless any gradient is non-finite
    fn step(&mut self, optimizer: &mut dyn Optimizer, params: &mut [&mut Tensor]) -> bool;

    /// Adjust the scale based on the last `step`
    fn update(&mut self);

    /// Current loss scale
    fn loss_scale(&self) -> f32;
}

/// Default number of successful steps before the loss scale is increased
const DEFAULT_SCALE_GROWTH_INTERVAL: usize = 2000;

/// Dynamic loss scaler
///
/// Backs off by `backoff_factor` on overflow and grows by `growth_factor`
/// after `growth_interval` clean steps.
#[derive(Debug)]
pub struct GradScaler {
    scale: f32,
    growth_factor: f32,
    backoff_factor: f32,
    pub(crate) growth_interval: usize,
    steps_since_growth: usize,
    dynamic: bool,
    precision: Precision,
    /// Set by `step`, consumed by `update`
    found_inf: bool,
    overflow_count: usize,
    successful_steps: usize,
}

impl GradScaler {
    pub fn new(initial_scale: f32) -> Self {
        Self {
            scale: initial_scale,
            growth_factor: 2.0,
            backoff_factor: 0.5,
            growth_interval: DEFAULT_SCALE_GROWTH_INTERVAL,
            steps_since_growth: 0,
            dynamic: true,
            precision: Precision::Fp16,
            found_inf: false,
            overflow_count: 0,
            successful_steps: 0,
        }
    }

    pub fn from_config(config: &MixedPrecisionConfig) -> Self {
        Self {
            scale: config.initial_scale,
            growth_factor: config.scale_growth_factor,
            backoff_factor: config.scale_backoff_factor,
            growth_interval: config.scale_growth_interval,
            dynamic: config.dynamic_scaling,
            precision: config.compute_precision,
            ..Self::new(config.initial_scale)
        }
    }

    /// Current scale
    pub fn scale_factor(&self) -> f32 {
        self.scale
    }

    /// Unscale gradients in place and check for overflow
    ///
    /// Returns true if every gradient is finite.
    pub fn unscale_and_check(&self, grads: &mut [f32]) -> bool {
        let inv_scale = 1.0 / self.scale;
        let mut finite = true;
        for grad in grads.iter_mut() {
            *grad = round_trip(*grad, self.precision) * inv_scale;
            finite &= grad.is_finite();
        }
        finite
    }

    /// Record the outcome of a step and adjust the scale
    pub fn record(&mut self, grads_valid: bool) {
        if grads_valid {
            self.successful_steps += 1;
        } else {
            self.overflow_count += 1;
        }
        if !self.dynamic {
            return;
        }

        if grads_valid {
            self.steps_since_growth += 1;
            if self.steps_since_growth >= self.growth_interval {
                self.scale *= self.growth_factor;
                self.steps_since_growth = 0;
            }
        } else {
            self.scale = (self.scale * self.backoff_factor).max(1.0);
            self.steps_since_growth = 0;
        }
    }

    pub fn overflow_count(&self) -> usize {
        self.overflow_count
    }

    pub fn successful_steps(&self) -> usize {
        self.successful_steps
    }
}

impl Default for GradScaler {
    fn default() -> Self {
        Self::new(65536.0)
    }
}

impl GradientScaler for GradScaler {
    fn scale(&self, loss: &Tensor) -> Tensor {
        scale(loss, self.scale)
    }

    fn step(&mut self, optimizer: &mut dyn Optimizer, params: &mut [&mut Tensor]) -> bool {
        let mut finite = true;
        for param in params.iter() {
            if let Some(grad) = param.grad() {
                let mut unscaled = grad.as_standard_layout().into_owned();
                if let Some(values) = unscaled.as_slice_mut() {
                    finite &= self.unscale_and_check(values);
                }
                param.set_grad(unscaled);
            }
        }

        self.found_inf = !finite;
        if finite {
            optimizer.step(params);
        } else {
            tracing::warn!(scale = self.scale, "non-finite gradients, skipping optimizer step");
        }
        finite
    }

    fn update(&mut self) {
        self.record(!self.found_inf);
        self.found_inf = false;
    }

    fn loss_scale(&self) -> f32 {
        self.scale
    }
}

/// Pass-through scaler for full-precision training
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopScaler;

impl GradientScaler for NoopScaler {
    fn scale(&self, loss: &Tensor) -> Tensor {
        loss.clone()
    }

    fn step(&mut self, optimizer: &mut dyn Optimizer, params: &mut [&mut Tensor]) -> bool {
        optimizer.step(params);
        true
    }

    fn update(&mut self) {}

    fn loss_scale(&self) -> f32 {
        1.0
    }
}

/// `GradScaler` for reduced precision, `NoopScaler` otherwise
pub fn scaler_from_config(config: &MixedPrecisionConfig) -> Box<dyn GradientScaler> {
    if config.is_mixed() {
        Box::new(GradScaler::from_config(config))
    } else {
        Box::new(NoopScaler)
    }
}
