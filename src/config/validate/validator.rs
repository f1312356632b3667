//! Configuration validation logic
//!
//! Validates training specifications for correctness before execution.

use super::error::ValidationError;
use crate::config::schema::TrainSpec;
use crate::model::IMAGE_SIZE;
use crate::train::AdamConfig;

/// Validate a training specification
///
/// Checks:
/// - Data and weight paths exist
/// - Numeric values are in valid ranges
pub fn validate_config(spec: &TrainSpec) -> Result<(), ValidationError> {
    if !spec.data.train.exists() {
        return Err(ValidationError::TrainDataNotFound(spec.data.train.display().to_string()));
    }
    if let Some(val_path) = &spec.data.val {
        if !val_path.exists() {
            return Err(ValidationError::ValDataNotFound(val_path.display().to_string()));
        }
    }
    if let Some(weights) = &spec.training.perceptual_weights {
        if !weights.exists() {
            return Err(ValidationError::PerceptualWeightsNotFound(
                weights.display().to_string(),
            ));
        }
    }

    validate_values(spec)
}

/// Range checks only, without touching the filesystem
pub fn validate_values(spec: &TrainSpec) -> Result<(), ValidationError> {
    if spec.data.batch_size == 0 {
        return Err(ValidationError::InvalidBatchSize(spec.data.batch_size));
    }
    if spec.data.image_size as usize != IMAGE_SIZE {
        return Err(ValidationError::InvalidImageSize(spec.data.image_size));
    }
    if !(0.0..=1.0).contains(&spec.data.flip_input) {
        return Err(ValidationError::InvalidFlipProbability(spec.data.flip_input));
    }

    validate_adam("generator", &spec.optimizer.generator)?;
    validate_adam("discriminator", &spec.optimizer.discriminator)?;

    if spec.training.epochs == 0 {
        return Err(ValidationError::InvalidEpochs(spec.training.epochs));
    }
    if spec.training.generator_steps == 0 {
        return Err(ValidationError::InvalidGeneratorSteps(spec.training.generator_steps));
    }

    let weights = &spec.training.loss_weights;
    for (name, value) in [
        ("adversarial", weights.adversarial),
        ("reconstruction", weights.reconstruction),
        ("perceptual", weights.perceptual),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(ValidationError::InvalidLossWeight(name, value));
        }
    }

    let generator = &spec.model.generator;
    if generator.base_channels == 0 {
        return Err(ValidationError::InvalidBaseChannels(generator.base_channels));
    }
    if !(0.0..1.0).contains(&generator.dropout) {
        return Err(ValidationError::InvalidDropout(generator.dropout));
    }
    if spec.model.discriminator.features.len() < 2 {
        return Err(ValidationError::InvalidDiscriminatorDepth(
            spec.model.discriminator.features.len(),
        ));
    }

    if spec.precision.initial_scale <= 0.0 {
        return Err(ValidationError::InvalidLossScale(spec.precision.initial_scale));
    }

    Ok(())
}

fn validate_adam(network: &'static str, adam: &AdamConfig) -> Result<(), ValidationError> {
    if adam.lr <= 0.0 || adam.lr > 1.0 {
        return Err(ValidationError::InvalidLearningRate(network, adam.lr));
    }
    for beta in [adam.beta1, adam.beta2] {
        if !(0.0..1.0).contains(&beta) {
            return Err(ValidationError::InvalidBeta(network, beta));
        }
    }
    Ok(())
}
