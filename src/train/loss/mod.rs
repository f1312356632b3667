//! Loss functions for adversarial image translation
//!
//! - [`BCEWithLogitsLoss`] - real/fake classification of critic patch logits
//! - [`L1Loss`] / [`SoftMaskedL1Loss`] - pixel reconstruction, chosen via [`ReconstructionLoss`]
//! - [`PerceptualLoss`] - distance in a frozen feature space
//! - [`generator_objective`] / [`discriminator_objective`] - the weighted GAN objectives

mod bce_with_logits;
mod l1;
mod objective;
mod perceptual;
mod traits;

pub use bce_with_logits::BCEWithLogitsLoss;
pub use l1::{L1Loss, ReconstructionLoss, SoftMaskedL1Loss};
pub use objective::{
    discriminator_objective, generator_objective, GeneratorLosses, LossWeights, FAKE_LABEL,
    REAL_LABEL,
};
pub use perceptual::{ConvFeatureExtractor, FeatureExtractor, PerceptualLoss};
pub use traits::LossFn;
