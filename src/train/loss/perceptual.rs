//! Feature-space perceptual distance

use crate::autograd::{add, mean, normalize_channels, relu, scale, square, sub, PaddingMode};
use crate::nn::{init_rng, prefixed, Conv2d, Module};
use crate::Tensor;

use super::LossFn;

/// Maps an image batch to a pyramid of feature maps
pub trait FeatureExtractor {
    /// Activations `[N, C_l, H_l, W_l]`, shallowest first
    fn features(&self, x: &Tensor) -> Vec<Tensor>;
}

/// Frozen pyramid of stride-2 convolutions with ReLU
///
/// Seeded so that two runs compare images in the same feature space. Trained
/// weights can replace the random ones through [`crate::io::load_weights`].
pub struct ConvFeatureExtractor {
    layers: Vec<Conv2d>,
}

impl ConvFeatureExtractor {
    pub const DEFAULT_WIDTHS: [usize; 4] = [3, 16, 32, 64];
    const SEED: u64 = 0x5eed;

    /// `widths[0]` is the image channel count
    pub fn new(widths: &[usize]) -> Self {
        let mut rng = init_rng(Some(Self::SEED));
        let layers = widths
            .windows(2)
            .map(|pair| Conv2d::downsample(pair[0], pair[1], PaddingMode::Zeros, &mut rng))
            .collect();
        let mut extractor = Self { layers };
        extractor.freeze();
        extractor
    }

    pub fn depth(&self) -> usize {
        self.layers.len()
    }
}

impl Default for ConvFeatureExtractor {
    fn default() -> Self {
        Self::new(&Self::DEFAULT_WIDTHS)
    }
}

impl FeatureExtractor for ConvFeatureExtractor {
    fn features(&self, x: &Tensor) -> Vec<Tensor> {
        let mut h = x.clone();
        let mut out = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            h = relu(&layer.forward(&h));
            out.push(h.clone());
        }
        out
    }
}

impl Module for ConvFeatureExtractor {
    fn named_parameters(&self) -> Vec<(String, &Tensor)> {
        self.layers
            .iter()
            .enumerate()
            .flat_map(|(i, layer)| prefixed(&format!("layers.{i}"), layer.named_parameters()).collect::<Vec<_>>())
            .collect()
    }

    fn named_parameters_mut(&mut self) -> Vec<(String, &mut Tensor)> {
        self.layers
            .iter_mut()
            .enumerate()
            .flat_map(|(i, layer)| {
                prefixed(&format!("layers.{i}"), layer.named_parameters_mut()).collect::<Vec<_>>()
            })
            .collect()
    }
}

/// Distance between unit-normalised activations
///
/// Per layer: normalise each spatial position across channels, take the
/// squared difference, sum over channels and average over positions and the
/// batch. The loss is the mean over layers, so identical images score 0.
pub struct PerceptualLoss<F = ConvFeatureExtractor> {
    extractor: F,
    epsilon: f32,
}

impl<F: FeatureExtractor> PerceptualLoss<F> {
    pub fn new(extractor: F) -> Self {
        Self { extractor, epsilon: 1e-10 }
    }

    pub fn extractor(&self) -> &F {
        &self.extractor
    }

    pub fn extractor_mut(&mut self) -> &mut F {
        &mut self.extractor
    }
}

impl Default for PerceptualLoss<ConvFeatureExtractor> {
    fn default() -> Self {
        Self::new(ConvFeatureExtractor::default())
    }
}

impl<F: FeatureExtractor> LossFn for PerceptualLoss<F> {
    fn forward(&self, predictions: &Tensor, targets: &Tensor) -> Tensor {
        assert_eq!(
            predictions.shape(),
            targets.shape(),
            "Predictions and targets must have same shape"
        );

        let pred_features = self.extractor.features(predictions);
        let target_features = self.extractor.features(targets);
        let layers = pred_features.len();
        if layers == 0 {
            return Tensor::zeros(&[1], false);
        }

        let mut total: Option<Tensor> = None;
        for (p, t) in pred_features.iter().zip(&target_features) {
            let channels = p.shape().get(1).copied().unwrap_or(1) as f32;
            let diff = sub(&normalize_channels(p, self.epsilon), &normalize_channels(t, self.epsilon));
            // mean over all elements times C = channel sum averaged over positions
            let layer = scale(&mean(&square(&diff)), channels);
            total = Some(match total {
                Some(acc) => add(&acc, &layer),
                None => layer,
            });
        }
        let total = total.unwrap_or_else(|| Tensor::zeros(&[1], false));
        scale(&total, 1.0 / layers as f32)
    }

    fn name(&self) -> &'static str {
        "Perceptual"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autograd::backward;

    fn small() -> PerceptualLoss {
        PerceptualLoss::new(ConvFeatureExtractor::new(&[3, 4, 8]))
    }

    #[test]
    fn test_identical_images_score_zero() {
        let img = Tensor::full(&[1, 3, 16, 16], 0.4, false);
        assert!(small().forward(&img, &img).item().abs() < 1e-6);
    }

    #[test]
    fn test_distance_is_positive_and_bounded() {
        let loss_fn = small();
        let a = Tensor::full(&[1, 3, 16, 16], -0.8, false);
        let mut b = Tensor::full(&[1, 3, 16, 16], 0.9, false);
        b.data_mut()[[0, 1, 3, 3]] = -1.0;
        let d = loss_fn.forward(&a, &b).item();
        // unit vectors differ by at most 2, squared at most 4
        assert!(d >= 0.0 && d <= 4.0, "d = {d}");
    }

    #[test]
    fn test_extractor_is_frozen_and_deterministic() {
        let a = ConvFeatureExtractor::default();
        let b = ConvFeatureExtractor::default();
        assert_eq!(a.depth(), 3);
        assert!(a.named_parameters().iter().all(|(_, p)| !p.requires_grad()));
        assert_eq!(a.named_parameters()[0].1.to_vec(), b.named_parameters()[0].1.to_vec());
        assert_eq!(a.named_parameters()[0].0, "layers.0.weight");
    }

    #[test]
    fn test_gradient_flows_to_prediction_only() {
        let loss_fn = small();
        let pred = Tensor::from_shape_vec(
            &[1, 3, 8, 8],
            (0..192).map(|i| ((i as f32) * 0.37).sin()).collect(),
            true,
        )
        .unwrap();
        let target = Tensor::full(&[1, 3, 8, 8], 0.1, false);
        backward(&loss_fn.forward(&pred, &target), None);
        let grad = pred.grad().expect("prediction receives a gradient");
        assert!(grad.iter().all(|g| g.is_finite()));
        assert!(loss_fn.extractor().named_parameters().iter().all(|(_, p)| p.grad().is_none()));
    }
}
