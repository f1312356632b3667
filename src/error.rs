//! Error types for boceto

use thiserror::Error;

/// Errors raised by training, checkpoint I/O and inference
#[derive(Debug, Error)]
pub enum Error {
    /// Tensor shape does not match what an operation or checkpoint requires
    #[error("Shape mismatch: expected {expected:?}, got {actual:?} ({context})")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
        context: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Checkpoint file is missing entries or is not a boceto checkpoint
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Image error: {0}")]
    Image(String),

    /// A training step failed; the run is aborted at this position
    #[error("Training failed at epoch {epoch}, batch {batch}: {source}")]
    Training {
        epoch: usize,
        batch: usize,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Build a shape mismatch error
    pub fn shape(expected: &[usize], actual: &[usize], context: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
            context: context.into(),
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Self::Image(e.to_string())
    }
}

impl From<safetensors::SafeTensorError> for Error {
    fn from(e: safetensors::SafeTensorError) -> Self {
        Self::Checkpoint(e.to_string())
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;
