//! Epoch-level training and validation examples

use super::core::GanTrainer;
use crate::autograd::{no_grad, Tensor};
use crate::data::PairedDataset;
use crate::error::{Error, Result};
use crate::io::save_triptych;
use crate::train::{Batch, EpochAccumulator, EpochSummary};
use std::path::Path;

impl GanTrainer {
    /// Train on every batch of one epoch and average the step losses
    ///
    /// `epoch` is zero-based. A failing batch aborts the epoch with
    /// [`Error::Training`] carrying the epoch and batch index.
    pub fn train_epoch<I>(&mut self, epoch: usize, batches: I) -> Result<EpochSummary>
    where
        I: IntoIterator<Item = Result<Batch>>,
    {
        let mut accumulator = EpochAccumulator::new();
        let interval = self.config.log_interval.max(1);

        for (index, batch) in batches.into_iter().enumerate() {
            let wrap = |source: Error| Error::Training { epoch, batch: index, source: Box::new(source) };
            let batch = batch.map_err(wrap)?;
            let losses = self.train_step(&batch).map_err(wrap)?;
            accumulator.add(&losses);

            if (index + 1) % interval == 0 {
                tracing::debug!(
                    epoch = epoch + 1,
                    batch = index + 1,
                    d_loss = losses.discriminator,
                    g_loss = losses.generator,
                    l1 = losses.reconstruction,
                    "training progress"
                );
            }
        }

        Ok(accumulator.finalize(epoch, self.config.epochs))
    }

    /// Write `input | generated | target` triptychs for the first pairs of `dataset`
    ///
    /// The generator runs in inference mode without dropout; files are named
    /// `epoch_{label}_{i}.png`. Returns the number of images written.
    pub fn save_examples(
        &mut self,
        dataset: &dyn PairedDataset,
        dir: &Path,
        label: usize,
    ) -> Result<usize> {
        let count = self.config.max_examples.min(dataset.len());
        self.ctx.eval();
        let mut written = 0;
        for i in 0..count {
            let pair = dataset.get(i)?;
            let input = Tensor::constant(pair.input.into_dyn());
            let target = Tensor::constant(pair.target.into_dyn());
            let batched = Tensor::constant(input.data().clone().insert_axis(ndarray::Axis(0)));

            let generated = no_grad(|| self.generator.forward(&batched, &mut self.ctx));
            let generated = match generated {
                Ok(generated) => generated,
                Err(e) => {
                    self.ctx.train();
                    return Err(e);
                }
            };
            save_triptych(dir.join(format!("epoch_{label}_{i}.png")), &input, &generated, &target)?;
            written += 1;
        }
        self.ctx.train();
        Ok(written)
    }
}
