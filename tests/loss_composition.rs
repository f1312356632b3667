//! Weighted composition of the adversarial objectives

use approx::assert_relative_eq;
use boceto::autograd::backward;
use boceto::train::loss::ConvFeatureExtractor;
use boceto::train::{
    discriminator_objective, generator_objective, BCEWithLogitsLoss, L1Loss, LossFn, LossWeights,
    PerceptualLoss,
};
use boceto::Tensor;

fn perceptual() -> PerceptualLoss {
    PerceptualLoss::new(ConvFeatureExtractor::new(&[3, 4]))
}

#[test]
fn test_total_is_weighted_sum_of_terms() {
    let logits = Tensor::full(&[1, 1, 4, 4], -0.3, true);
    let fake = Tensor::from_shape_vec(&[1, 3, 8, 8], (0..192).map(|i| (i as f32 / 96.0) - 1.0).collect(), true)
        .unwrap();
    let target = Tensor::full(&[1, 3, 8, 8], 0.1, false);
    let weights = LossWeights::default();
    let loss_fn = perceptual();

    let losses = generator_objective(&logits, &fake, &target, &weights, &L1Loss, &loss_fn);
    let expected = losses.adversarial + 5.0 * losses.reconstruction + losses.perceptual;
    assert_relative_eq!(losses.total.item(), expected, epsilon = 1e-4);

    assert_relative_eq!(losses.adversarial, BCEWithLogitsLoss.against_label(&logits, 1.0).item(), epsilon = 1e-6);
    assert_relative_eq!(losses.reconstruction, L1Loss.forward(&fake, &target).item(), epsilon = 1e-6);
    assert!(losses.perceptual > 0.0);
}

#[test]
fn test_gradients_reach_generator_output_and_logits() {
    let logits = Tensor::zeros(&[1, 1, 2, 2], true);
    let fake = Tensor::full(&[1, 3, 8, 8], 0.4, true);
    let target = Tensor::full(&[1, 3, 8, 8], -0.4, false);
    let weights = LossWeights { perceptual: 0.0, ..LossWeights::default() };

    let losses = generator_objective(&logits, &fake, &target, &weights, &L1Loss, &perceptual());
    backward(&losses.total, None);

    // Pushing the fake up raises L1 against a lower target
    assert!(fake.grad().unwrap().iter().all(|&g| g > 0.0));
    // Raising a logit lowers the "real" BCE
    assert!(logits.grad().unwrap().iter().all(|&g| g < 0.0));
}

#[test]
fn test_zero_weights_remove_terms() {
    let logits = Tensor::full(&[1, 1, 2, 2], 1.5, false);
    let fake = Tensor::full(&[1, 3, 8, 8], 0.9, false);
    let target = Tensor::full(&[1, 3, 8, 8], -0.9, false);
    let weights = LossWeights { adversarial: 0.0, reconstruction: 1.0, perceptual: 0.0 };

    let losses = generator_objective(&logits, &fake, &target, &weights, &L1Loss, &perceptual());
    assert_relative_eq!(losses.total.item(), 1.8, epsilon = 1e-5);
}

#[test]
fn test_confident_critic_has_low_discriminator_loss() {
    let sure = discriminator_objective(&Tensor::full(&[1, 1, 2, 2], 6.0, false), &Tensor::full(&[1, 1, 2, 2], -6.0, false));
    let unsure = discriminator_objective(&Tensor::zeros(&[1, 1, 2, 2], false), &Tensor::zeros(&[1, 1, 2, 2], false));
    assert!(sure.item() < 0.01);
    assert_relative_eq!(unsure.item(), std::f32::consts::LN_2, epsilon = 1e-6);
}
