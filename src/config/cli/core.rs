//! Core CLI types - Cli, Command, and argument structs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::types::OutputFormat;
use crate::inference::DEFAULT_SAMPLES;

/// Boceto: sketch-to-image translation with a conditional GAN
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "boceto")]
#[command(version)]
#[command(about = "Train and run a U-Net/PatchGAN image translator with best-of-N sampling")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Train a generator/discriminator pair from YAML configuration
    Train(TrainArgs),

    /// Validate a configuration file without training
    Validate(ValidateArgs),

    /// Translate one image with best-of-N sampling
    Generate(GenerateArgs),

    /// Run best-of-N over a validation folder and report mean L1
    Evaluate(EvaluateArgs),

    /// Display information about a checkpoint
    Info(InfoArgs),

    /// Serve the HTTP generation endpoint
    #[cfg(feature = "server")]
    Serve(ServeArgs),
}

/// Arguments for the train command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct TrainArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Resume from the configured checkpoints
    #[arg(short, long)]
    pub resume: bool,

    /// Override number of epochs
    #[arg(short, long)]
    pub epochs: Option<usize>,

    /// Override batch size
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Random seed for reproducibility
    #[arg(long)]
    pub seed: Option<u64>,

    /// Dry run (validate config but don't train)
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the validate command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ValidateArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Show the resolved configuration
    #[arg(short, long)]
    pub detailed: bool,
}

/// Checkpoints of one generator/discriminator pair
///
/// Architectures are read from the checkpoint metadata.
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct CheckpointArgs {
    /// Generator checkpoint
    #[arg(long = "checkpoint-gen", value_name = "FILE")]
    pub generator: PathBuf,

    /// Discriminator checkpoint
    #[arg(long = "checkpoint-disc", value_name = "FILE")]
    pub discriminator: PathBuf,
}

/// Arguments for the generate command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub checkpoints: CheckpointArgs,

    /// Input image (any size; resized to 256x256)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output PNG
    #[arg(short, long)]
    pub output: PathBuf,

    /// Candidates to draw
    #[arg(short = 'n', long, default_value_t = DEFAULT_SAMPLES)]
    pub samples: usize,

    /// Sampling seed
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Arguments for the evaluate command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct EvaluateArgs {
    #[command(flatten)]
    pub checkpoints: CheckpointArgs,

    /// Folder of side-by-side validation pairs
    #[arg(value_name = "VAL_DIR")]
    pub val_dir: PathBuf,

    /// Where the numbered triptychs are written
    #[arg(short, long, default_value = "val_results")]
    pub output_dir: PathBuf,

    /// Candidates to draw per image
    #[arg(short = 'n', long, default_value_t = DEFAULT_SAMPLES)]
    pub samples: usize,

    /// Evaluate at most this many images
    #[arg(long, default_value_t = 120)]
    pub max_images: usize,

    /// Sampling seed
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Arguments for the info command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct InfoArgs {
    /// Checkpoint file
    #[arg(value_name = "CHECKPOINT")]
    pub checkpoint: PathBuf,

    /// Output format (text, json, yaml)
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the serve command
#[cfg(feature = "server")]
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ServeArgs {
    /// Object generator checkpoint
    #[arg(long)]
    pub object_gen: Option<PathBuf>,

    /// Object discriminator checkpoint
    #[arg(long)]
    pub object_disc: Option<PathBuf>,

    /// Scene generator checkpoint
    #[arg(long)]
    pub scene_gen: Option<PathBuf>,

    /// Scene discriminator checkpoint
    #[arg(long)]
    pub scene_disc: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8000")]
    pub addr: String,

    /// Candidates drawn per request
    #[arg(short = 'n', long, default_value_t = DEFAULT_SAMPLES)]
    pub samples: usize,
}

/// Parse CLI arguments from a string slice (for testing)
pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}

/// Apply command-line overrides to a TrainSpec
pub fn apply_overrides(spec: &mut crate::config::TrainSpec, args: &TrainArgs) {
    if let Some(epochs) = args.epochs {
        spec.training.epochs = epochs;
    }
    if let Some(batch_size) = args.batch_size {
        spec.data.batch_size = batch_size;
    }
    if let Some(seed) = args.seed {
        spec.training.seed = Some(seed);
    }
    if args.resume {
        spec.checkpoint.load = true;
    }
}
