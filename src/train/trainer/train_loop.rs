//! Multi-epoch training loop

use super::core::GanTrainer;
use super::result::TrainReport;
use crate::data::{BatchLoader, PairedDataset};
use crate::error::Result;
use crate::io::save_checkpoint;
use crate::train::EpochSummary;
use std::fs::OpenOptions;
use std::io::Write;
use std::time::Instant;

impl GanTrainer {
    /// Train from `start_epoch` up to the configured number of epochs
    ///
    /// After every epoch the summary line is logged and appended to the loss
    /// log, both checkpoints are overwritten with the number of completed
    /// epochs, and validation triptychs are written when `validation` is given.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use boceto::train::{GanTrainer, TrainConfig};
    /// # use boceto::data::{BatchLoader, FolderDataset, LoaderConfig};
    /// # use std::sync::Arc;
    /// let train = BatchLoader::new(Arc::new(FolderDataset::open("data/train", 256)?), LoaderConfig::default());
    /// let val = FolderDataset::open("data/val", 256)?;
    ///
    /// let mut trainer = GanTrainer::new(TrainConfig::default())?;
    /// let report = trainer.fit(&train, Some(&val))?;
    /// println!("{} epochs in {:.1}s", report.epochs_run, report.elapsed_secs);
    /// # Ok::<(), boceto::Error>(())
    /// ```
    pub fn fit(
        &mut self,
        train: &BatchLoader,
        validation: Option<&dyn PairedDataset>,
    ) -> Result<TrainReport> {
        let start = Instant::now();
        let start_epoch = self.start_epoch;
        let total = self.config.epochs;

        tracing::info!(
            start_epoch,
            epochs = total,
            batches_per_epoch = train.num_batches(),
            "starting training"
        );

        for epoch in start_epoch..total {
            let summary = self.train_epoch(epoch, train.epoch(epoch))?;
            tracing::info!("{summary}");
            self.finish_epoch(&summary, validation)?;
            self.history.push(summary);
        }

        let report = TrainReport {
            start_epoch,
            epochs_run: total.saturating_sub(start_epoch),
            final_epoch: total.max(start_epoch),
            history: self.history.clone(),
            elapsed_secs: start.elapsed().as_secs_f64(),
            loss_scales: self.loss_scales(),
        };
        tracing::info!(
            epochs_run = report.epochs_run,
            elapsed_secs = report.elapsed_secs,
            "training finished"
        );
        Ok(report)
    }

    /// Persist everything that follows a completed epoch
    fn finish_epoch(
        &mut self,
        summary: &EpochSummary,
        validation: Option<&dyn PairedDataset>,
    ) -> Result<()> {
        let completed = summary.epoch + 1;

        if let Some(path) = &self.config.loss_log {
            let mut file = OpenOptions::new().create(true).append(true).open(path)?;
            writeln!(file, "{summary}")?;
        }

        if self.config.checkpoint.save {
            let ckpt = &self.config.checkpoint;
            save_checkpoint(
                &ckpt.generator,
                &self.generator,
                &self.gen_optimizer,
                completed,
                &self.config.generator.architecture(),
            )?;
            save_checkpoint(
                &ckpt.discriminator,
                &self.discriminator,
                &self.disc_optimizer,
                completed,
                &self.config.discriminator.architecture(),
            )?;
        }

        if let (Some(dataset), Some(dir)) = (validation, self.config.evaluation_dir.clone()) {
            let written = self.save_examples(dataset, &dir, completed)?;
            tracing::debug!(dir = %dir.display(), written, "validation examples saved");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::data::{BatchLoader, ImagePair, LoaderConfig, MemoryDataset};
    use crate::io::inspect_checkpoint;
    use crate::model::{DiscriminatorConfig, GeneratorConfig};
    use crate::train::{CheckpointConfig, GanTrainer, TrainConfig};
    use ndarray::Array3;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn dataset(n: usize) -> MemoryDataset {
        let pairs = (0..n)
            .map(|i| ImagePair {
                input: Array3::from_elem((3, 256, 256), -1.0 + i as f32 * 0.1),
                target: Array3::from_elem((3, 256, 256), 0.5),
            })
            .collect();
        MemoryDataset::new(pairs)
    }

    fn config(dir: &Path, epochs: usize, load: bool) -> TrainConfig {
        let mut config = TrainConfig::in_memory().with_seed(5).with_epochs(epochs).with_models(
            GeneratorConfig { base_channels: 1, ..GeneratorConfig::default() },
            DiscriminatorConfig::scaled_down(64),
        );
        config.checkpoint = CheckpointConfig {
            generator: dir.join("ckpt/gen.safetensors"),
            discriminator: dir.join("ckpt/disc.safetensors"),
            load,
            save: true,
        };
        config.loss_log = Some(dir.join("losses.txt"));
        config.evaluation_dir = Some(dir.join("Evaluation"));
        config.max_examples = 2;
        config
    }

    fn loader() -> BatchLoader {
        BatchLoader::new(Arc::new(dataset(2)), LoaderConfig::default().with_batch_size(2))
    }

    #[test]
    fn test_fit_writes_log_checkpoints_and_examples() {
        let dir = TempDir::new().unwrap();
        let mut trainer = GanTrainer::new(config(dir.path(), 1, false)).unwrap();
        let val = dataset(3);
        let report = trainer.fit(&loader(), Some(&val)).unwrap();

        assert_eq!((report.start_epoch, report.epochs_run, report.final_epoch), (0, 1, 1));
        assert_eq!(report.history.len(), 1);

        let log = std::fs::read_to_string(dir.path().join("losses.txt")).unwrap();
        assert_eq!(log.lines().count(), 1);
        assert!(log.starts_with("Epoch [1/1] | D Loss: "));

        let info = inspect_checkpoint(dir.path().join("ckpt/gen.safetensors")).unwrap();
        assert_eq!(info.epoch, 1);
        assert!(info.has_optimizer_state);
        assert!(dir.path().join("ckpt/disc.safetensors").exists());

        assert!(dir.path().join("Evaluation/epoch_1_0.png").exists());
        assert!(dir.path().join("Evaluation/epoch_1_1.png").exists());
        assert!(!dir.path().join("Evaluation/epoch_1_2.png").exists());
    }

    #[test]
    fn test_resume_continues_from_saved_epoch() {
        let dir = TempDir::new().unwrap();
        GanTrainer::new(config(dir.path(), 1, false)).unwrap().fit(&loader(), None).unwrap();

        let mut resumed = GanTrainer::new(config(dir.path(), 2, true)).unwrap();
        assert_eq!(resumed.start_epoch(), 1);
        let report = resumed.fit(&loader(), None).unwrap();
        assert_eq!(report.epochs_run, 1);
        assert_eq!(report.history[0].epoch, 1);

        let log = std::fs::read_to_string(dir.path().join("losses.txt")).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("Epoch [2/2]"));
        assert_eq!(inspect_checkpoint(dir.path().join("ckpt/gen.safetensors")).unwrap().epoch, 2);
    }

    #[test]
    fn test_completed_run_does_nothing() {
        let dir = TempDir::new().unwrap();
        GanTrainer::new(config(dir.path(), 1, false)).unwrap().fit(&loader(), None).unwrap();

        let mut again = GanTrainer::new(config(dir.path(), 1, true)).unwrap();
        let report = again.fit(&loader(), None).unwrap();
        assert_eq!(report.epochs_run, 0);
        assert!(report.history.is_empty());
    }

    #[test]
    fn test_fresh_run_starts_at_zero() {
        let dir = TempDir::new().unwrap();
        let trainer = GanTrainer::new(config(dir.path(), 3, false)).unwrap();
        assert_eq!(trainer.start_epoch(), 0);
    }

    #[test]
    fn test_resume_without_checkpoints_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(GanTrainer::new(config(dir.path(), 3, true)), Err(crate::Error::Io(_))));
    }
}
