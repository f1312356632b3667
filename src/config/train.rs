//! Single-command training from YAML configuration

use super::builder::{build_loader_config, build_train_config};
use super::schema::TrainSpec;
use super::validate::validate_config;
use crate::data::{BatchLoader, FolderDataset, PairedDataset};
use crate::error::{Error, Result};
use crate::train::{GanTrainer, TrainReport};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Train a generator/discriminator pair from a YAML configuration file
///
/// This is the main entry point for declarative training. It:
/// 1. Loads, parses and validates the YAML config
/// 2. Opens the training and validation folders
/// 3. Builds both networks, resuming from checkpoints if configured
/// 4. Runs the adversarial training loop
///
/// # Example
///
/// ```no_run
/// use boceto::config::train_from_yaml;
///
/// let report = train_from_yaml("scene.yaml")?;
/// println!("trained {} epochs", report.epochs_run);
/// # Ok::<(), boceto::Error>(())
/// ```
pub fn train_from_yaml<P: AsRef<Path>>(config_path: P) -> Result<TrainReport> {
    let spec = load_config(config_path)?;
    train_from_spec(&spec)
}

/// Run training for an already loaded and validated spec
pub fn train_from_spec(spec: &TrainSpec) -> Result<TrainReport> {
    let train = FolderDataset::open(&spec.data.train, spec.data.image_size)?;
    if train.is_empty() {
        return Err(Error::ConfigError(format!(
            "No training images found in {}",
            spec.data.train.display()
        )));
    }
    let validation = spec
        .data
        .val
        .as_ref()
        .map(|path| FolderDataset::open(path, spec.data.image_size))
        .transpose()?;

    tracing::info!(
        train = %spec.data.train.display(),
        pairs = train.len(),
        validation_pairs = validation.as_ref().map_or(0, |v| v.len()),
        batch_size = spec.data.batch_size,
        epochs = spec.training.epochs,
        "config loaded and validated"
    );

    let loader = BatchLoader::new(Arc::new(train), build_loader_config(spec));
    let mut trainer = GanTrainer::new(build_train_config(spec))?;
    trainer.fit(&loader, validation.as_ref().map(|v| v as &dyn PairedDataset))
}

/// Load training spec from YAML file (without running training)
///
/// Useful for testing config parsing and validation separately from training.
pub fn load_config<P: AsRef<Path>>(config_path: P) -> Result<TrainSpec> {
    let yaml_content = fs::read_to_string(config_path.as_ref()).map_err(|e| {
        Error::ConfigError(format!(
            "Failed to read config file {}: {}",
            config_path.as_ref().display(),
            e
        ))
    })?;

    let spec: TrainSpec = serde_yaml::from_str(&yaml_content)
        .map_err(|e| Error::ConfigError(format!("Failed to parse YAML config: {e}")))?;

    validate_config(&spec).map_err(|e| Error::ConfigError(format!("Invalid config: {e}")))?;

    Ok(spec)
}
