//! Validation error types
//!
//! Defines all validation error variants for training specifications.

/// Validation error type
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Training data path does not exist: {0}")]
    TrainDataNotFound(String),

    #[error("Validation data path does not exist: {0}")]
    ValDataNotFound(String),

    #[error("Perceptual weights file does not exist: {0}")]
    PerceptualWeightsNotFound(String),

    #[error("Invalid learning rate for {0}: {1} (must be > 0.0 and <= 1.0)")]
    InvalidLearningRate(&'static str, f32),

    #[error("Invalid Adam beta for {0}: {1} (must be in [0.0, 1.0))")]
    InvalidBeta(&'static str, f32),

    #[error("Invalid batch size: {0} (must be > 0)")]
    InvalidBatchSize(usize),

    #[error("Invalid epochs: {0} (must be > 0)")]
    InvalidEpochs(usize),

    #[error("Invalid image size: {0} (the networks require 256)")]
    InvalidImageSize(u32),

    #[error("Invalid generator steps: {0} (must be > 0)")]
    InvalidGeneratorSteps(usize),

    #[error("Invalid {0} loss weight: {1} (must be finite and >= 0.0)")]
    InvalidLossWeight(&'static str, f32),

    #[error("Invalid flip probability: {0} (must be in [0.0, 1.0])")]
    InvalidFlipProbability(f32),

    #[error("Invalid base channels: {0} (must be > 0)")]
    InvalidBaseChannels(usize),

    #[error("Invalid dropout rate: {0} (must be in [0.0, 1.0))")]
    InvalidDropout(f32),

    #[error("Discriminator needs at least two feature stages, got {0}")]
    InvalidDiscriminatorDepth(usize),

    #[error("Invalid initial loss scale: {0} (must be > 0.0)")]
    InvalidLossScale(f32),
}
