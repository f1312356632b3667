//! Boceto CLI
//!
//! # Usage
//!
//! ```bash
//! # Train from config
//! boceto train scene.yaml
//!
//! # Resume with overrides
//! boceto train scene.yaml --resume --epochs 600
//!
//! # Translate one image, keeping the best of 5 candidates
//! boceto generate --checkpoint-gen gen.safetensors --checkpoint-disc disc.safetensors \
//!     --input sketch.png --output photo.png -n 5
//!
//! # Inspect a checkpoint
//! boceto info gen.safetensors
//! ```

use boceto::cli::{run_command, Cli};
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
