//! YAML schema for declarative GAN training

use crate::autograd::MixedPrecisionConfig;
use crate::model::{DiscriminatorConfig, GeneratorConfig, IMAGE_SIZE};
use crate::train::{AdamConfig, CheckpointConfig, LossWeights, ReconstructionLoss};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// Deserialize a bool from either a YAML boolean (`true`) or a quoted string (`"true"`).
fn deserialize_bool_lenient<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        Str(String),
    }

    match BoolOrString::deserialize(deserializer)? {
        BoolOrString::Bool(b) => Ok(b),
        BoolOrString::Str(s) => match s.to_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "expected 'true' or 'false', got '{other}'"
            ))),
        },
    }
}

/// Complete training specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainSpec {
    /// Paired image folders
    pub data: DataSpec,

    /// Network architectures
    #[serde(default)]
    pub model: ModelSpec,

    /// One Adam optimizer per network
    #[serde(default)]
    pub optimizer: OptimizerSpec,

    /// Training hyperparameters
    #[serde(default)]
    pub training: TrainingParams,

    /// Loss scaling
    #[serde(default)]
    pub precision: MixedPrecisionConfig,

    /// Checkpoint locations and resume behaviour
    #[serde(default)]
    pub checkpoint: CheckpointConfig,

    /// Loss log and validation images
    #[serde(default)]
    pub output: OutputSpec,
}

/// Data configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSpec {
    /// Folder of side-by-side (input | target) training images
    pub train: PathBuf,

    /// Optional folder of validation pairs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub val: Option<PathBuf>,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Side length images are resized to
    #[serde(default = "default_image_size")]
    pub image_size: u32,

    #[serde(default = "default_true", deserialize_with = "deserialize_bool_lenient")]
    pub shuffle: bool,

    /// Probability of mirroring the input image horizontally
    #[serde(default)]
    pub flip_input: f32,
}

impl Default for DataSpec {
    fn default() -> Self {
        Self {
            train: PathBuf::new(),
            val: None,
            batch_size: default_batch_size(),
            image_size: default_image_size(),
            shuffle: true,
            flip_input: 0.0,
        }
    }
}

fn default_batch_size() -> usize {
    16
}

fn default_image_size() -> u32 {
    IMAGE_SIZE as u32
}

/// Network architectures
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSpec {
    pub generator: GeneratorConfig,
    pub discriminator: DiscriminatorConfig,
}

/// Optimizer configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerSpec {
    pub generator: AdamConfig,
    pub discriminator: AdamConfig,
}

impl Default for OptimizerSpec {
    fn default() -> Self {
        Self { generator: AdamConfig::generator(), discriminator: AdamConfig::discriminator() }
    }
}

/// Training hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingParams {
    /// Number of epochs
    pub epochs: usize,

    /// Generator updates per discriminator update
    pub generator_steps: usize,

    pub loss_weights: LossWeights,

    /// Pixel reconstruction term: `l1` or `soft_masked`
    pub reconstruction: ReconstructionLoss,

    /// Batches between progress events
    pub log_interval: usize,

    /// Abort on a non-finite loss instead of continuing
    #[serde(deserialize_with = "deserialize_bool_lenient")]
    pub halt_on_non_finite: bool,

    /// Frozen perceptual feature weights (safetensors)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perceptual_weights: Option<PathBuf>,

    /// Global random seed for reproducibility
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            epochs: 500,
            generator_steps: 2,
            loss_weights: LossWeights::default(),
            reconstruction: ReconstructionLoss::L1,
            log_interval: 10,
            halt_on_non_finite: false,
            perceptual_weights: None,
            seed: None,
        }
    }
}

/// Per-epoch outputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSpec {
    /// File the epoch summary lines are appended to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loss_log: Option<PathBuf>,

    /// Directory for validation triptychs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation_dir: Option<PathBuf>,

    /// Triptychs written per epoch
    pub max_examples: usize,
}

impl Default for OutputSpec {
    fn default() -> Self {
        Self {
            loss_log: Some(PathBuf::from("losses.txt")),
            evaluation_dir: Some(PathBuf::from("Evaluation")),
            max_examples: 6,
        }
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autograd::Precision;

    #[test]
    fn test_deserialize_minimal_config() {
        let yaml = r"
data:
  train: data/train
";

        let spec: TrainSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.data.train, PathBuf::from("data/train"));
        assert_eq!(spec.data.batch_size, 16);
        assert_eq!(spec.data.image_size, 256);
        assert!(spec.data.shuffle);
        assert_eq!(spec.training.epochs, 500);
        assert_eq!(spec.training.generator_steps, 2);
        assert_eq!(spec.optimizer.generator.lr, 2e-4);
        assert_eq!(spec.optimizer.discriminator.lr, 1e-4);
        assert_eq!(spec.precision.compute_precision, Precision::Fp16);
        assert!(!spec.checkpoint.load);
        assert_eq!(spec.output.loss_log, Some(PathBuf::from("losses.txt")));
    }

    #[test]
    fn test_deserialize_full_config() {
        let yaml = r#"
data:
  train: SceneDataset/train
  val: SceneDataset/val
  batch_size: 8
  shuffle: "false"
  flip_input: 0.5

model:
  generator:
    base_channels: 32
  discriminator:
    features: [32, 64, 128, 256]

optimizer:
  generator:
    lr: 0.0003
  discriminator:
    lr: 0.0001
    beta1: 0.5

training:
  epochs: 40
  loss_weights:
    reconstruction: 10.0
  reconstruction: soft_masked
  halt_on_non_finite: "true"
  seed: 42

precision:
  compute_precision: fp32

checkpoint:
  generator: ckpt/SceneGen.safetensors
  discriminator: ckpt/SceneDisc.safetensors
  load: true

output:
  evaluation_dir: out/Evaluation
  max_examples: 2
"#;

        let spec: TrainSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.data.val, Some(PathBuf::from("SceneDataset/val")));
        assert!(!spec.data.shuffle);
        assert_eq!(spec.data.flip_input, 0.5);
        assert_eq!(spec.model.generator.base_channels, 32);
        assert_eq!(spec.model.generator.dropout, 0.5);
        assert_eq!(spec.model.discriminator.features, vec![32, 64, 128, 256]);
        assert_eq!(spec.optimizer.generator.lr, 0.0003);
        assert_eq!(spec.optimizer.generator.beta1, 0.5);
        assert_eq!(spec.optimizer.discriminator.beta1, 0.5);
        assert_eq!(spec.training.loss_weights.reconstruction, 10.0);
        assert_eq!(spec.training.loss_weights.adversarial, 1.0);
        assert_eq!(spec.training.reconstruction, ReconstructionLoss::SoftMasked);
        assert!(spec.training.halt_on_non_finite);
        assert_eq!(spec.training.seed, Some(42));
        assert_eq!(spec.precision.compute_precision, Precision::Fp32);
        assert!(spec.checkpoint.load && spec.checkpoint.save);
        assert_eq!(spec.output.max_examples, 2);
        assert_eq!(spec.output.loss_log, Some(PathBuf::from("losses.txt")));
    }

    #[test]
    fn test_missing_data_section_rejected() {
        assert!(serde_yaml::from_str::<TrainSpec>("training:\n  epochs: 1\n").is_err());
    }

    #[test]
    fn test_bad_lenient_bool_rejected() {
        let yaml = "data:\n  train: t\n  shuffle: \"yes\"\n";
        assert!(serde_yaml::from_str::<TrainSpec>(yaml).is_err());
    }

    #[test]
    fn test_serialize_roundtrip() {
        let spec = TrainSpec {
            data: DataSpec { train: PathBuf::from("train"), ..Default::default() },
            model: ModelSpec::default(),
            optimizer: OptimizerSpec::default(),
            training: TrainingParams::default(),
            precision: MixedPrecisionConfig::default(),
            checkpoint: CheckpointConfig::default(),
            output: OutputSpec::default(),
        };
        let yaml = serde_yaml::to_string(&spec).unwrap();
        let back: TrainSpec = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(spec, back);
    }
}
