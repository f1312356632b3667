//! Core GanTrainer struct and setup

use crate::autograd::{precision::scaler_from_config, Context, ForwardMode, GradientScaler};
use crate::error::Result;
use crate::io::{load_checkpoint, load_weights};
use crate::model::{PatchDiscriminator, UNetGenerator};
use crate::optim::{Adam, Optimizer};
use crate::train::loss::PerceptualLoss;
use crate::train::{EpochSummary, TrainConfig};
use std::path::Path;

/// Alternating discriminator/generator optimisation of a conditional GAN
///
/// Each network has its own Adam optimizer and gradient scaler. Every batch
/// runs one discriminator update followed by `generator_steps` generator
/// updates.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use boceto::data::{BatchLoader, FolderDataset, LoaderConfig};
/// use boceto::train::{GanTrainer, TrainConfig};
///
/// let dataset = Arc::new(FolderDataset::open("data/train", 256)?);
/// let loader = BatchLoader::new(dataset, LoaderConfig::default());
/// let mut trainer = GanTrainer::new(TrainConfig::default().with_epochs(10))?;
/// let report = trainer.fit(&loader, None)?;
/// println!("finished at epoch {}", report.final_epoch);
/// # Ok::<(), boceto::Error>(())
/// ```
pub struct GanTrainer {
    pub(crate) generator: UNetGenerator,
    pub(crate) discriminator: PatchDiscriminator,
    pub(crate) gen_optimizer: Adam,
    pub(crate) disc_optimizer: Adam,
    pub(crate) gen_scaler: Box<dyn GradientScaler>,
    pub(crate) disc_scaler: Box<dyn GradientScaler>,
    pub(crate) perceptual: PerceptualLoss,
    pub(crate) ctx: Context,
    pub(crate) config: TrainConfig,
    /// First epoch `fit` will run
    pub(crate) start_epoch: usize,
    pub(crate) history: Vec<EpochSummary>,
}

impl GanTrainer {
    /// Build both networks and, if configured, restore them from checkpoints
    ///
    /// With `checkpoint.load` set, a missing or unreadable checkpoint is an error.
    pub fn new(config: TrainConfig) -> Result<Self> {
        let (generator, discriminator, ctx) = match config.seed {
            Some(seed) => (
                UNetGenerator::with_seed(config.generator.clone(), seed),
                PatchDiscriminator::with_seed(config.discriminator.clone(), seed.wrapping_add(1)),
                Context::with_seed(ForwardMode::Training, seed.wrapping_add(2)),
            ),
            None => (
                UNetGenerator::new(config.generator.clone()),
                PatchDiscriminator::new(config.discriminator.clone()),
                Context::new(ForwardMode::Training),
            ),
        };

        let mut perceptual = PerceptualLoss::default();
        if let Some(path) = &config.perceptual_weights {
            load_weights(path, perceptual.extractor_mut())?;
            tracing::info!(path = %path.display(), "perceptual feature weights loaded");
        }

        let mut trainer = Self {
            generator,
            discriminator,
            gen_optimizer: config.generator_optim.build(),
            disc_optimizer: config.discriminator_optim.build(),
            gen_scaler: scaler_from_config(&config.precision),
            disc_scaler: scaler_from_config(&config.precision),
            perceptual,
            ctx,
            config,
            start_epoch: 0,
            history: Vec::new(),
        };

        if trainer.config.checkpoint.load {
            let gen_path = trainer.config.checkpoint.generator.clone();
            let disc_path = trainer.config.checkpoint.discriminator.clone();
            trainer.resume(&gen_path, &disc_path)?;
        }

        tracing::info!(
            generator_params = crate::nn::Module::num_parameters(&trainer.generator),
            discriminator_params = crate::nn::Module::num_parameters(&trainer.discriminator),
            precision = %trainer.config.precision.compute_precision,
            "trainer ready"
        );
        Ok(trainer)
    }

    /// Restore both networks and optimizers; returns the epoch to start from
    ///
    /// Learning rates are reset to the configured values.
    pub fn resume(&mut self, generator: &Path, discriminator: &Path) -> Result<usize> {
        let gen_lr = self.config.generator_optim.lr;
        let disc_lr = self.config.discriminator_optim.lr;
        let epoch = load_checkpoint(generator, &mut self.generator, &mut self.gen_optimizer, gen_lr)?;
        let disc_epoch =
            load_checkpoint(discriminator, &mut self.discriminator, &mut self.disc_optimizer, disc_lr)?;
        if disc_epoch != epoch {
            tracing::warn!(epoch, disc_epoch, "generator and discriminator checkpoints disagree");
        }
        self.start_epoch = epoch;
        Ok(epoch)
    }

    pub fn generator(&self) -> &UNetGenerator {
        &self.generator
    }

    pub fn discriminator(&self) -> &PatchDiscriminator {
        &self.discriminator
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    pub fn start_epoch(&self) -> usize {
        self.start_epoch
    }

    /// Summaries of the epochs run by this trainer
    pub fn history(&self) -> &[EpochSummary] {
        &self.history
    }

    /// Current (generator, discriminator) learning rates
    pub fn learning_rates(&self) -> (f32, f32) {
        (self.gen_optimizer.lr(), self.disc_optimizer.lr())
    }

    /// Current (generator, discriminator) loss scales
    pub fn loss_scales(&self) -> (f32, f32) {
        (self.gen_scaler.loss_scale(), self.disc_scaler.loss_scale())
    }

    /// Hand the trained networks to an inference pipeline
    pub fn into_models(self) -> (UNetGenerator, PatchDiscriminator) {
        (self.generator, self.discriminator)
    }
}
