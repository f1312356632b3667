//! Combined adversarial objectives

use crate::autograd::{add, scale};
use crate::Tensor;
use serde::{Deserialize, Serialize};

use super::{BCEWithLogitsLoss, LossFn};

/// Label the critic should assign to ground-truth pairs
pub const REAL_LABEL: f32 = 1.0;
/// Label the critic should assign to generated pairs
pub const FAKE_LABEL: f32 = 0.0;

/// Coefficients of the generator objective
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LossWeights {
    pub adversarial: f32,
    pub reconstruction: f32,
    pub perceptual: f32,
}

impl Default for LossWeights {
    fn default() -> Self {
        Self { adversarial: 1.0, reconstruction: 5.0, perceptual: 1.0 }
    }
}

/// Generator loss terms for one step
///
/// Components are unweighted; `total` is the weighted sum and carries the
/// graph for backpropagation.
pub struct GeneratorLosses {
    pub adversarial: f32,
    pub reconstruction: f32,
    pub perceptual: f32,
    pub total: Tensor,
}

/// `w_adv·BCE(D(x, G(x)), 1) + w_rec·R(G(x), y) + w_p·P(G(x), y)`
///
/// `R` is the pixel reconstruction loss, plain L1 by default.
///
/// `fake_logits` must be computed from `fake` without detaching so the
/// adversarial term reaches the generator.
pub fn generator_objective(
    fake_logits: &Tensor,
    fake: &Tensor,
    target: &Tensor,
    weights: &LossWeights,
    reconstruction: &dyn LossFn,
    perceptual: &dyn LossFn,
) -> GeneratorLosses {
    let adversarial = BCEWithLogitsLoss.against_label(fake_logits, REAL_LABEL);
    let reconstruction = reconstruction.forward(fake, target);
    let perceptual_term = perceptual.forward(fake, target);

    let total = add(
        &add(
            &scale(&adversarial, weights.adversarial),
            &scale(&reconstruction, weights.reconstruction),
        ),
        &scale(&perceptual_term, weights.perceptual),
    );

    GeneratorLosses {
        adversarial: adversarial.item(),
        reconstruction: reconstruction.item(),
        perceptual: perceptual_term.item(),
        total,
    }
}

/// Mean of the critic's errors on genuine and generated pairs
///
/// `(BCE(real, 1) + BCE(fake, 0)) / 2`; `fake_logits` should come from a
/// detached candidate so only the critic is updated.
pub fn discriminator_objective(real_logits: &Tensor, fake_logits: &Tensor) -> Tensor {
    let real = BCEWithLogitsLoss.against_label(real_logits, REAL_LABEL);
    let fake = BCEWithLogitsLoss.against_label(fake_logits, FAKE_LABEL);
    scale(&add(&real, &fake), 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autograd::backward;
    use crate::train::loss::{ConvFeatureExtractor, L1Loss, PerceptualLoss, ReconstructionLoss};
    use approx::assert_relative_eq;

    fn softplus(x: f32) -> f32 {
        x.exp().ln_1p()
    }

    #[test]
    fn test_identical_candidate_leaves_only_adversarial_term() {
        let perceptual = PerceptualLoss::new(ConvFeatureExtractor::new(&[3, 4]));
        let logits = Tensor::full(&[1, 1, 30, 30], 0.5, true);
        let image = Tensor::full(&[1, 3, 8, 8], 0.2, false);

        let losses =
            generator_objective(&logits, &image, &image, &LossWeights::default(), &L1Loss, &perceptual);
        assert_relative_eq!(losses.adversarial, softplus(-0.5), epsilon = 1e-6);
        assert_eq!(losses.reconstruction, 0.0);
        assert!(losses.perceptual.abs() < 1e-6);
        assert_relative_eq!(losses.total.item(), losses.adversarial, epsilon = 1e-6);
    }

    #[test]
    fn test_reconstruction_weighted_five_times() {
        let perceptual = PerceptualLoss::new(ConvFeatureExtractor::new(&[3, 4]));
        let logits = Tensor::zeros(&[1, 1, 2, 2], false);
        let fake = Tensor::full(&[1, 3, 4, 4], 0.5, false);
        let target = Tensor::full(&[1, 3, 4, 4], 0.3, false);
        let weights = LossWeights { perceptual: 0.0, ..LossWeights::default() };

        let losses = generator_objective(&logits, &fake, &target, &weights, &L1Loss, &perceptual);
        assert_relative_eq!(losses.reconstruction, 0.2, epsilon = 1e-6);
        assert_relative_eq!(
            losses.total.item(),
            std::f32::consts::LN_2 + 5.0 * 0.2,
            epsilon = 1e-5
        );
    }

    #[test]
    fn test_soft_masked_reconstruction_discounts_white_target() {
        let perceptual = PerceptualLoss::new(ConvFeatureExtractor::new(&[3, 4]));
        let logits = Tensor::zeros(&[1, 1, 2, 2], false);
        let fake = Tensor::full(&[1, 3, 4, 4], 0.0, false);
        let white = Tensor::full(&[1, 3, 4, 4], 1.0, false);
        let weights = LossWeights { perceptual: 0.0, ..LossWeights::default() };

        let plain = generator_objective(&logits, &fake, &white, &weights, &ReconstructionLoss::L1, &perceptual);
        let masked =
            generator_objective(&logits, &fake, &white, &weights, &ReconstructionLoss::SoftMasked, &perceptual);
        assert_relative_eq!(plain.reconstruction, 1.0, epsilon = 1e-6);
        assert_relative_eq!(masked.reconstruction, 0.2, epsilon = 1e-6);
        assert!(masked.total.item() < plain.total.item());
    }

    #[test]
    fn test_discriminator_objective_averages_both_sides() {
        let real = Tensor::full(&[1, 1, 2, 2], 2.0, true);
        let fake = Tensor::full(&[1, 1, 2, 2], -1.0, true);
        let loss = discriminator_objective(&real, &fake);
        assert_relative_eq!(loss.item(), (softplus(-2.0) + softplus(-1.0)) / 2.0, epsilon = 1e-6);

        backward(&loss, None);
        // ∂/∂x of BCE(x, 1) is σ(x) - 1, halved and spread over 4 logits
        let g_real = real.grad().unwrap()[[0, 0, 0, 0]];
        let expected = (1.0 / (1.0 + (-2.0f32).exp()) - 1.0) / 8.0;
        assert_relative_eq!(g_real, expected, epsilon = 1e-6);
        assert!(fake.grad().unwrap().iter().all(|&g| g > 0.0));
    }

    #[test]
    fn test_default_weights_from_yaml() {
        let w: LossWeights = serde_yaml::from_str("reconstruction: 10.0").unwrap();
        assert_eq!(w.reconstruction, 10.0);
        assert_eq!(w.adversarial, 1.0);
    }
}
