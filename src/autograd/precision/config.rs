//! Mixed-precision settings.

use super::Precision;
use serde::{Deserialize, Serialize};

/// Loss-scaling configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixedPrecisionConfig {
    /// Format gradients are computed in
    pub compute_precision: Precision,
    /// Loss scale at the start of training
    pub initial_scale: f32,
    /// Multiplier applied after `scale_growth_interval` clean steps
    pub scale_growth_factor: f32,
    /// Multiplier applied when gradients overflow
    pub scale_backoff_factor: f32,
    pub scale_growth_interval: usize,
    /// Adjust the scale at runtime
    pub dynamic_scaling: bool,
}

impl MixedPrecisionConfig {
    /// Full precision, no loss scaling
    pub fn fp32() -> Self {
        Self {
            compute_precision: Precision::Fp32,
            initial_scale: 1.0,
            scale_growth_factor: 2.0,
            scale_backoff_factor: 0.5,
            scale_growth_interval: 2000,
            dynamic_scaling: false,
        }
    }

    /// Half precision gradients with dynamic loss scaling from 2^16
    pub fn fp16() -> Self {
        Self {
            compute_precision: Precision::Fp16,
            initial_scale: 65536.0,
            dynamic_scaling: true,
            ..Self::fp32()
        }
    }

    /// bf16 keeps f32's exponent range, so no scaling by default
    pub fn bf16() -> Self {
        Self { compute_precision: Precision::Bf16, ..Self::fp32() }
    }

    pub fn is_mixed(&self) -> bool {
        self.compute_precision.is_reduced()
    }

    pub fn with_initial_scale(mut self, scale: f32) -> Self {
        self.initial_scale = scale;
        self
    }

    pub fn with_dynamic_scaling(mut self, enabled: bool) -> Self {
        self.dynamic_scaling = enabled;
        self
    }

    pub fn with_growth_interval(mut self, interval: usize) -> Self {
        self.scale_growth_interval = interval;
        self
    }
}

impl Default for MixedPrecisionConfig {
    fn default() -> Self {
        Self::fp16()
    }
}
