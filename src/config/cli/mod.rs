//! CLI argument parsing
//!
//! # Usage
//!
//! ```bash
//! boceto train scene.yaml
//! boceto train scene.yaml --epochs 50 --resume
//! boceto validate scene.yaml
//! boceto generate --checkpoint-gen gen.safetensors --checkpoint-disc disc.safetensors \
//!     --input sketch.png --output out.png -n 5
//! boceto evaluate SceneDataset/val --checkpoint-gen gen.safetensors --checkpoint-disc disc.safetensors
//! boceto info gen.safetensors --format json
//! ```

mod core;
mod types;

#[cfg(feature = "server")]
pub use core::ServeArgs;
pub use core::{
    apply_overrides, parse_args, CheckpointArgs, Cli, Command, EvaluateArgs, GenerateArgs,
    InfoArgs, TrainArgs, ValidateArgs,
};
pub use types::OutputFormat;
