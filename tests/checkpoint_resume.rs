//! Checkpoint persistence and training resumption

use boceto::autograd::{no_grad, Context, ForwardMode};
use boceto::data::{BatchLoader, ImagePair, LoaderConfig, MemoryDataset};
use boceto::inference::{ModelPair, VariantPaths};
use boceto::io::{inspect_checkpoint, load_weights, save_checkpoint};
use boceto::model::{DiscriminatorConfig, GeneratorConfig, PatchDiscriminator, UNetGenerator};
use boceto::optim::Adam;
use boceto::train::{CheckpointConfig, GanTrainer, TrainConfig};
use boceto::{Error, Tensor};
use ndarray::Array3;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn gen_config() -> GeneratorConfig {
    GeneratorConfig { base_channels: 1, ..GeneratorConfig::default() }
}

fn disc_config() -> DiscriminatorConfig {
    DiscriminatorConfig::scaled_down(64)
}

fn adam() -> Adam {
    Adam::new(2e-4, 0.5, 0.999, 1e-8)
}

fn train_config(dir: &Path, epochs: usize) -> TrainConfig {
    let mut config = TrainConfig::in_memory().with_seed(3).with_epochs(epochs).with_models(gen_config(), disc_config());
    config.checkpoint = CheckpointConfig {
        generator: dir.join("gen.safetensors"),
        discriminator: dir.join("disc.safetensors"),
        load: true,
        save: true,
    };
    config
}

fn write_checkpoints(dir: &Path, epoch: usize) {
    let generator = UNetGenerator::with_seed(gen_config(), 1);
    let discriminator = PatchDiscriminator::with_seed(disc_config(), 2);
    save_checkpoint(dir.join("gen.safetensors"), &generator, &adam(), epoch, &gen_config().architecture()).unwrap();
    save_checkpoint(dir.join("disc.safetensors"), &discriminator, &adam(), epoch, &disc_config().architecture())
        .unwrap();
}

#[test]
fn test_reloaded_generator_produces_identical_output() {
    let dir = TempDir::new().unwrap();
    let original = UNetGenerator::with_seed(gen_config(), 1);
    save_checkpoint(dir.path().join("gen.safetensors"), &original, &adam(), 0, "unet-3x1").unwrap();

    let mut restored = UNetGenerator::with_seed(gen_config(), 99);
    load_weights(dir.path().join("gen.safetensors"), &mut restored).unwrap();

    let x = Tensor::full(&[1, 3, 256, 256], -0.4, false);
    let a = no_grad(|| original.forward(&x, &mut Context::with_seed(ForwardMode::Inference, 0))).unwrap();
    let b = no_grad(|| restored.forward(&x, &mut Context::with_seed(ForwardMode::Inference, 0))).unwrap();
    assert_eq!(a.data(), b.data());
}

#[test]
fn test_wrong_architecture_fails_to_load() {
    let dir = TempDir::new().unwrap();
    write_checkpoints(dir.path(), 0);

    let mut wider = UNetGenerator::with_seed(GeneratorConfig { base_channels: 2, ..GeneratorConfig::default() }, 1);
    let result = load_weights(dir.path().join("gen.safetensors"), &mut wider);
    assert!(matches!(result, Err(Error::ShapeMismatch { .. })));
}

#[test]
fn test_deeper_critic_checkpoint_is_rejected() {
    let dir = TempDir::new().unwrap();
    let deeper = DiscriminatorConfig { features: vec![1, 2, 4, 8, 8], ..disc_config() };
    let critic = PatchDiscriminator::with_seed(deeper.clone(), 2);
    save_checkpoint(dir.path().join("disc.safetensors"), &critic, &adam(), 0, &deeper.architecture()).unwrap();

    let mut shallow = PatchDiscriminator::with_seed(disc_config(), 2);
    let result = load_weights(dir.path().join("disc.safetensors"), &mut shallow);
    assert!(matches!(result, Err(Error::Checkpoint(_))));
}

#[test]
fn test_inference_pair_loads_from_metadata() {
    let dir = TempDir::new().unwrap();
    write_checkpoints(dir.path(), 7);

    let paths = VariantPaths::from_checkpoints(dir.path().join("gen.safetensors"), dir.path().join("disc.safetensors"))
        .unwrap();
    assert_eq!(paths.generator_config, gen_config());
    assert_eq!(paths.discriminator_config, disc_config());
    assert!(ModelPair::load(&paths).is_ok());
}

#[test]
fn test_checkpoint_after_tenth_epoch_resumes_at_ten() {
    let dir = TempDir::new().unwrap();
    write_checkpoints(dir.path(), 10);

    let trainer = GanTrainer::new(train_config(dir.path(), 12)).unwrap();
    assert_eq!(trainer.start_epoch(), 10);
    assert_eq!(trainer.learning_rates(), (2e-4, 1e-4));
}

#[test]
fn test_missing_checkpoint_fails_at_startup() {
    let dir = TempDir::new().unwrap();
    let result = GanTrainer::new(train_config(dir.path(), 1));
    assert!(matches!(result, Err(Error::Io(_))));

    // One of the pair present is still an error
    let generator = UNetGenerator::with_seed(gen_config(), 1);
    save_checkpoint(dir.path().join("gen.safetensors"), &generator, &adam(), 4, &gen_config().architecture()).unwrap();
    assert!(GanTrainer::new(train_config(dir.path(), 5)).is_err());
}

#[test]
fn test_resumed_fit_runs_remaining_epochs() {
    let dir = TempDir::new().unwrap();
    write_checkpoints(dir.path(), 10);
    let dataset = MemoryDataset::new(vec![ImagePair {
        input: Array3::from_elem((3, 256, 256), -1.0),
        target: Array3::from_elem((3, 256, 256), 1.0),
    }]);
    let loader = BatchLoader::new(Arc::new(dataset), LoaderConfig::default().with_batch_size(1));

    let mut trainer = GanTrainer::new(train_config(dir.path(), 11)).unwrap();
    let report = trainer.fit(&loader, None).unwrap();

    assert_eq!((report.start_epoch, report.epochs_run, report.final_epoch), (10, 1, 11));
    assert_eq!(inspect_checkpoint(dir.path().join("gen.safetensors")).unwrap().epoch, 11);
    let summary = report.last().unwrap();
    assert_eq!(summary.epoch, 10);
    assert!(summary.generator.is_finite() && summary.discriminator.is_finite());
}
