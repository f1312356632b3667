//! One adversarial training step

use super::core::GanTrainer;
use crate::autograd::{backward, no_grad};
use crate::error::{Error, Result};
use crate::model::Critic;
use crate::nn::Module;
use crate::train::loss::{discriminator_objective, generator_objective};
use crate::train::{Batch, StepLosses};

impl GanTrainer {
    /// Update the discriminator once, then the generator `generator_steps` times
    ///
    /// The discriminator sees the candidate detached from the generator graph.
    /// Generator updates backpropagate through the discriminator, whose
    /// gradients are discarded afterwards.
    pub fn train_step(&mut self, batch: &Batch) -> Result<StepLosses> {
        let (inputs, targets) = (&batch.inputs, &batch.targets);
        self.ctx.train();

        // Discriminator: genuine pairs towards 1, generated pairs towards 0
        let fake = no_grad(|| self.generator.forward(inputs, &mut self.ctx))?;
        let real_logits = self.discriminator.logits(inputs, targets, &mut self.ctx)?;
        let fake_logits = self.discriminator.logits(inputs, &fake.detach(), &mut self.ctx)?;
        let d_loss = discriminator_objective(&real_logits, &fake_logits);
        let mut losses = StepLosses { discriminator: d_loss.item(), ..StepLosses::default() };
        self.check_finite(&losses)?;

        self.discriminator.zero_grad();
        backward(&self.disc_scaler.scale(&d_loss), None);
        self.disc_scaler.step(&mut self.disc_optimizer, &mut self.discriminator.parameters_mut());
        self.disc_scaler.update();

        // Generator: fool the critic while staying close to the target
        for _ in 0..self.config.generator_steps.max(1) {
            let fake = self.generator.forward(inputs, &mut self.ctx)?;
            let fake_logits = self.discriminator.logits(inputs, &fake, &mut self.ctx)?;
            let g = generator_objective(
                &fake_logits,
                &fake,
                targets,
                &self.config.loss_weights,
                &self.config.reconstruction,
                &self.perceptual,
            );

            losses.generator = g.total.item();
            losses.adversarial = g.adversarial;
            losses.reconstruction = g.reconstruction;
            losses.perceptual = g.perceptual;
            if let Err(e) = self.check_finite(&losses) {
                self.discriminator.zero_grad();
                return Err(e);
            }

            self.generator.zero_grad();
            backward(&self.gen_scaler.scale(&g.total), None);
            self.gen_scaler.step(&mut self.gen_optimizer, &mut self.generator.parameters_mut());
            self.gen_scaler.update();
        }
        self.discriminator.zero_grad();
        Ok(losses)
    }

    /// With `halt_on_non_finite`, reject a loss before it reaches an optimizer
    fn check_finite(&self, losses: &StepLosses) -> Result<()> {
        if self.config.halt_on_non_finite && !losses.is_finite() {
            return Err(Error::InvalidParameter(format!("non-finite loss: {losses:?}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::autograd::Tensor;
    use crate::model::{DiscriminatorConfig, GeneratorConfig};
    use crate::nn::Module;
    use crate::train::{Batch, GanTrainer, TrainConfig};

    fn tiny_config() -> TrainConfig {
        TrainConfig::in_memory().with_seed(11).with_epochs(1).with_models(
            GeneratorConfig { base_channels: 1, ..GeneratorConfig::default() },
            DiscriminatorConfig::scaled_down(64),
        )
    }

    fn batch() -> Batch {
        let inputs = Tensor::from_shape_vec(
            &[1, 3, 256, 256],
            (0..3 * 256 * 256).map(|i| ((i % 97) as f32 / 48.0) - 1.0).collect(),
            false,
        )
        .unwrap();
        Batch::new(inputs, Tensor::full(&[1, 3, 256, 256], 0.5, false))
    }

    #[test]
    fn test_step_updates_both_networks() {
        let mut trainer = GanTrainer::new(tiny_config()).unwrap();
        let gen_before = trainer.generator().named_parameters()[0].1.to_vec();
        let disc_before = trainer.discriminator().named_parameters()[0].1.to_vec();

        let losses = trainer.train_step(&batch()).unwrap();
        assert!(losses.is_finite());
        assert!(losses.discriminator > 0.0);
        assert!(losses.reconstruction > 0.0);

        assert_ne!(trainer.generator().named_parameters()[0].1.to_vec(), gen_before);
        assert_ne!(trainer.discriminator().named_parameters()[0].1.to_vec(), disc_before);
    }

    #[test]
    fn test_step_leaves_no_discriminator_gradients() {
        let mut trainer = GanTrainer::new(tiny_config()).unwrap();
        trainer.train_step(&batch()).unwrap();
        assert!(trainer.discriminator().named_parameters().iter().all(|(_, p)| p.grad().is_none()));
    }

    #[test]
    fn test_generator_loss_composition() {
        let mut trainer = GanTrainer::new(tiny_config()).unwrap();
        let l = trainer.train_step(&batch()).unwrap();
        let recomposed = l.adversarial + 5.0 * l.reconstruction + l.perceptual;
        assert!((l.generator - recomposed).abs() < 1e-4 * recomposed.abs().max(1.0));
    }

    #[test]
    fn test_non_finite_loss_halts_before_any_update() {
        let mut config = tiny_config();
        config.halt_on_non_finite = true;
        let mut trainer = GanTrainer::new(config).unwrap();
        let gen_before = trainer.generator().named_parameters()[0].1.to_vec();
        let disc_before = trainer.discriminator().named_parameters()[0].1.to_vec();

        let poisoned = Batch::new(
            Tensor::full(&[1, 3, 256, 256], f32::NAN, false),
            Tensor::full(&[1, 3, 256, 256], 0.5, false),
        );
        assert!(matches!(trainer.train_step(&poisoned), Err(crate::Error::InvalidParameter(_))));
        assert_eq!(trainer.generator().named_parameters()[0].1.to_vec(), gen_before);
        assert_eq!(trainer.discriminator().named_parameters()[0].1.to_vec(), disc_before);
    }

    #[test]
    fn test_wrong_resolution_is_rejected() {
        let mut trainer = GanTrainer::new(tiny_config()).unwrap();
        let small = Batch::new(Tensor::zeros(&[1, 3, 64, 64], false), Tensor::zeros(&[1, 3, 64, 64], false));
        assert!(matches!(trainer.train_step(&small), Err(crate::Error::ShapeMismatch { .. })));
    }
}
