//! Per-step losses and their epoch averages

use serde::{Deserialize, Serialize};
use std::fmt;

/// Losses reported by one training step
///
/// Generator terms come from the last generator update of the step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StepLosses {
    pub discriminator: f32,
    pub generator: f32,
    pub reconstruction: f32,
    pub adversarial: f32,
    pub perceptual: f32,
}

impl StepLosses {
    pub fn is_finite(&self) -> bool {
        [self.discriminator, self.generator, self.reconstruction, self.adversarial, self.perceptual]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Running sums of step losses
#[derive(Debug, Clone, Default)]
pub struct EpochAccumulator {
    totals: StepLosses,
    batches: usize,
}

impl EpochAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn add(&mut self, step: &StepLosses) {
        self.totals.discriminator += step.discriminator;
        self.totals.generator += step.generator;
        self.totals.reconstruction += step.reconstruction;
        self.totals.adversarial += step.adversarial;
        self.totals.perceptual += step.perceptual;
        self.batches += 1;
    }

    pub fn batches(&self) -> usize {
        self.batches
    }

    /// Averages over the batches seen; all zero for an empty epoch
    pub fn finalize(&self, epoch: usize, total_epochs: usize) -> EpochSummary {
        let n = self.batches.max(1) as f32;
        let t = &self.totals;
        EpochSummary {
            epoch,
            total_epochs,
            batches: self.batches,
            discriminator: t.discriminator / n,
            generator: t.generator / n,
            reconstruction: t.reconstruction / n,
            adversarial: t.adversarial / n,
        }
    }
}

/// Mean losses of one epoch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochSummary {
    /// Zero-based epoch index
    pub epoch: usize,
    pub total_epochs: usize,
    pub batches: usize,
    pub discriminator: f32,
    pub generator: f32,
    pub reconstruction: f32,
    pub adversarial: f32,
}

impl EpochSummary {
    /// Generator loss left after removing the adversarial and weighted L1 terms
    ///
    /// Equals the perceptual term when the reconstruction weight is 5.
    pub fn perceptual(&self) -> f32 {
        self.generator - self.adversarial - 5.0 * self.reconstruction
    }
}

impl fmt::Display for EpochSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Epoch [{}/{}] | D Loss: {:.4} | G Loss: {:.4} | L1 Loss: {:.4} | Adv Loss: {:.4} | p Loss: {:.4}",
            self.epoch + 1,
            self.total_epochs,
            self.discriminator,
            self.generator,
            self.reconstruction,
            self.adversarial,
            self.perceptual()
        )
    }
}
