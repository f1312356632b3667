//! Runtime configuration of an adversarial training run

use super::loss::{LossWeights, ReconstructionLoss};
use crate::autograd::MixedPrecisionConfig;
use crate::model::{DiscriminatorConfig, GeneratorConfig};
use crate::optim::Adam;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Adam hyperparameters for one network
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdamConfig {
    pub lr: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub eps: f32,
}

impl Default for AdamConfig {
    fn default() -> Self {
        Self::generator()
    }
}

impl AdamConfig {
    /// lr 2e-4, betas (0.5, 0.999)
    pub fn generator() -> Self {
        Self { lr: 2e-4, beta1: 0.5, beta2: 0.999, eps: 1e-8 }
    }

    /// lr 1e-4, betas (0.9, 0.999)
    pub fn discriminator() -> Self {
        Self { lr: 1e-4, beta1: 0.9, beta2: 0.999, eps: 1e-8 }
    }

    pub fn build(&self) -> Adam {
        Adam::new(self.lr, self.beta1, self.beta2, self.eps)
    }
}

/// Where checkpoints live and whether to read/write them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    pub generator: PathBuf,
    pub discriminator: PathBuf,
    /// Resume from the files above; both must exist
    pub load: bool,
    /// Overwrite the files above after every epoch
    pub save: bool,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            generator: PathBuf::from("checkpoints/gen.safetensors"),
            discriminator: PathBuf::from("checkpoints/disc.safetensors"),
            load: false,
            save: true,
        }
    }
}

/// Training hyperparameters and output locations
#[derive(Debug, Clone, PartialEq)]
pub struct TrainConfig {
    pub generator: GeneratorConfig,
    pub discriminator: DiscriminatorConfig,
    pub generator_optim: AdamConfig,
    pub discriminator_optim: AdamConfig,
    pub loss_weights: LossWeights,
    pub reconstruction: ReconstructionLoss,
    /// Generator updates per discriminator update
    pub generator_steps: usize,
    pub epochs: usize,
    pub precision: MixedPrecisionConfig,
    pub checkpoint: CheckpointConfig,
    /// Frozen perceptual feature weights; seeded random features when absent
    pub perceptual_weights: Option<PathBuf>,
    /// Append one summary line per epoch here
    pub loss_log: Option<PathBuf>,
    /// Write validation triptychs here
    pub evaluation_dir: Option<PathBuf>,
    /// Triptychs written per epoch
    pub max_examples: usize,
    /// Batch interval for `debug!` progress events
    pub log_interval: usize,
    /// Turn a non-finite loss into a training error
    pub halt_on_non_finite: bool,
    /// Seed for weight init and dropout; OS entropy when `None`
    pub seed: Option<u64>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            generator: GeneratorConfig::default(),
            discriminator: DiscriminatorConfig::default(),
            generator_optim: AdamConfig::generator(),
            discriminator_optim: AdamConfig::discriminator(),
            loss_weights: LossWeights::default(),
            reconstruction: ReconstructionLoss::L1,
            generator_steps: 2,
            epochs: 500,
            precision: MixedPrecisionConfig::fp16(),
            checkpoint: CheckpointConfig::default(),
            perceptual_weights: None,
            loss_log: Some(PathBuf::from("losses.txt")),
            evaluation_dir: Some(PathBuf::from("Evaluation")),
            max_examples: 6,
            log_interval: 10,
            halt_on_non_finite: false,
            seed: None,
        }
    }
}

impl TrainConfig {
    /// No files written, full precision: for tests and dry runs
    pub fn in_memory() -> Self {
        Self {
            precision: MixedPrecisionConfig::fp32(),
            checkpoint: CheckpointConfig { load: false, save: false, ..CheckpointConfig::default() },
            loss_log: None,
            evaluation_dir: None,
            ..Self::default()
        }
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_models(mut self, generator: GeneratorConfig, discriminator: DiscriminatorConfig) -> Self {
        self.generator = generator;
        self.discriminator = discriminator;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autograd::Precision;
    use crate::optim::Optimizer;

    #[test]
    fn test_defaults_match_reference_run() {
        let config = TrainConfig::default();
        assert_eq!(config.epochs, 500);
        assert_eq!(config.generator_steps, 2);
        assert_eq!(config.generator_optim.lr, 2e-4);
        assert_eq!(config.generator_optim.beta1, 0.5);
        assert_eq!(config.discriminator_optim.lr, 1e-4);
        assert_eq!(config.discriminator_optim.beta1, 0.9);
        assert_eq!(config.loss_weights.reconstruction, 5.0);
        assert_eq!(config.reconstruction, ReconstructionLoss::L1);
        assert_eq!(config.precision.compute_precision, Precision::Fp16);
    }

    #[test]
    fn test_in_memory_writes_nothing() {
        let config = TrainConfig::in_memory();
        assert!(!config.checkpoint.save && !config.checkpoint.load);
        assert!(config.loss_log.is_none() && config.evaluation_dir.is_none());
        assert_eq!(config.precision.compute_precision, Precision::Fp32);
    }

    #[test]
    fn test_adam_config_builds_optimizer() {
        let adam = AdamConfig::discriminator().build();
        assert_eq!(adam.lr(), 1e-4);
        assert_eq!(adam.betas(), (0.9, 0.999));
    }
}
