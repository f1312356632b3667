//! Declarative training configuration
//!
//! - `schema`: the YAML `TrainSpec`
//! - `validate`: range and path checks
//! - `builder`: conversion into trainer and loader settings
//! - `cli`: command-line arguments and overrides

mod builder;
pub mod cli;
mod schema;
mod train;
mod validate;

pub use builder::{build_loader_config, build_train_config};
#[cfg(feature = "server")]
pub use cli::ServeArgs;
pub use cli::{
    apply_overrides, parse_args, CheckpointArgs, Cli, Command, EvaluateArgs, GenerateArgs,
    InfoArgs, OutputFormat, TrainArgs, ValidateArgs,
};
pub use schema::{DataSpec, ModelSpec, OptimizerSpec, OutputSpec, TrainSpec, TrainingParams};
pub use train::{load_config, train_from_spec, train_from_yaml};
pub use validate::{validate_config, validate_values, ValidationError};
