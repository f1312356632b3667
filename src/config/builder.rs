//! Build runtime configuration from a YAML spec

use super::schema::TrainSpec;
use crate::data::LoaderConfig;
use crate::train::TrainConfig;

/// Trainer settings described by `spec`
pub fn build_train_config(spec: &TrainSpec) -> TrainConfig {
    TrainConfig {
        generator: spec.model.generator.clone(),
        discriminator: spec.model.discriminator.clone(),
        generator_optim: spec.optimizer.generator,
        discriminator_optim: spec.optimizer.discriminator,
        loss_weights: spec.training.loss_weights,
        reconstruction: spec.training.reconstruction,
        generator_steps: spec.training.generator_steps,
        epochs: spec.training.epochs,
        precision: spec.precision.clone(),
        checkpoint: spec.checkpoint.clone(),
        perceptual_weights: spec.training.perceptual_weights.clone(),
        loss_log: spec.output.loss_log.clone(),
        evaluation_dir: spec.output.evaluation_dir.clone(),
        max_examples: spec.output.max_examples,
        log_interval: spec.training.log_interval,
        halt_on_non_finite: spec.training.halt_on_non_finite,
        seed: spec.training.seed,
    }
}

/// Batch loader settings described by `spec`
///
/// The shuffle seed follows the training seed so a seeded run is
/// reproducible end to end.
pub fn build_loader_config(spec: &TrainSpec) -> LoaderConfig {
    LoaderConfig::default()
        .with_batch_size(spec.data.batch_size)
        .with_shuffle(spec.data.shuffle)
        .with_seed(spec.training.seed.unwrap_or(0))
        .with_flip_input(spec.data.flip_input)
}
