//! Pixel reconstruction losses

use crate::autograd::{abs, mean, mul, sub};
use crate::Tensor;
use ndarray::Axis;
use serde::{Deserialize, Serialize};

use super::LossFn;

/// Mean absolute error
///
/// L = mean(|predictions - targets|)
pub struct L1Loss;

impl LossFn for L1Loss {
    fn forward(&self, predictions: &Tensor, targets: &Tensor) -> Tensor {
        mean(&abs(&sub(predictions, targets)))
    }

    fn name(&self) -> &'static str {
        "L1"
    }
}

/// L1 weighted towards dark, textured target pixels
///
/// For images in [-1, 1], whiteness is the channel mean mapped to [0, 1] and
/// each pixel is weighted by `base + (1 - base) * (1 - whiteness)`, so white
/// background keeps at least `base` of the weight.
pub struct SoftMaskedL1Loss {
    pub base_weight: f32,
}

impl SoftMaskedL1Loss {
    pub fn new(base_weight: f32) -> Self {
        Self { base_weight }
    }

    fn pixel_weights(&self, targets: &Tensor) -> Tensor {
        let data = targets.data();
        let channels = data.shape().get(1).copied().unwrap_or(1);
        let whiteness = data
            .mapv(|v| v * 0.5 + 0.5)
            .sum_axis(Axis(1))
            .mapv(|v| v / channels as f32)
            .insert_axis(Axis(1));
        let weights = whiteness.mapv(|w| self.base_weight + (1.0 - self.base_weight) * (1.0 - w));
        let full = weights
            .broadcast(data.raw_dim())
            .map(|view| view.to_owned())
            .unwrap_or_else(|| ndarray::ArrayD::ones(data.raw_dim()));
        Tensor::constant(full)
    }
}

impl Default for SoftMaskedL1Loss {
    fn default() -> Self {
        Self::new(0.2)
    }
}

impl LossFn for SoftMaskedL1Loss {
    fn forward(&self, predictions: &Tensor, targets: &Tensor) -> Tensor {
        let diff = abs(&sub(predictions, targets));
        mean(&mul(&diff, &self.pixel_weights(targets)))
    }

    fn name(&self) -> &'static str {
        "SoftMaskedL1"
    }
}

/// Reconstruction term selected by `training.reconstruction`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconstructionLoss {
    #[default]
    L1,
    /// [`SoftMaskedL1Loss`] with its default base weight
    SoftMasked,
}

impl LossFn for ReconstructionLoss {
    fn forward(&self, predictions: &Tensor, targets: &Tensor) -> Tensor {
        match self {
            Self::L1 => L1Loss.forward(predictions, targets),
            Self::SoftMasked => SoftMaskedL1Loss::default().forward(predictions, targets),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::L1 => "L1",
            Self::SoftMasked => "SoftMaskedL1",
        }
    }
}
