//! Shuffled, prefetching batch loader

use super::dataset::{ImagePair, PairedDataset};
use crate::error::{Error, Result};
use crate::train::Batch;
use crate::Tensor;
use ndarray::{stack, Array3, ArrayD, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{sync_channel, Receiver};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Batching and augmentation options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub batch_size: usize,
    pub shuffle: bool,
    /// Base seed; each epoch shuffles with `seed + epoch`
    pub seed: u64,
    /// Probability of mirroring the input (never the target) horizontally
    pub flip_input: f32,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self { batch_size: 16, shuffle: true, seed: 0, flip_input: 0.0 }
    }
}

impl LoaderConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_flip_input(mut self, probability: f32) -> Self {
        self.flip_input = probability.clamp(0.0, 1.0);
        self
    }
}

/// Splits a dataset into batches, one epoch at a time
///
/// Decoding runs on a background thread one batch ahead of the consumer.
pub struct BatchLoader {
    dataset: Arc<dyn PairedDataset>,
    config: LoaderConfig,
}

impl BatchLoader {
    pub fn new(dataset: Arc<dyn PairedDataset>, config: LoaderConfig) -> Self {
        let config = LoaderConfig { batch_size: config.batch_size.max(1), ..config };
        Self { dataset, config }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn dataset(&self) -> &Arc<dyn PairedDataset> {
        &self.dataset
    }

    /// Batches per epoch; the last batch may be smaller
    pub fn num_batches(&self) -> usize {
        self.dataset.len().div_ceil(self.config.batch_size)
    }

    /// Sample order for `epoch`, reproducible for a fixed seed
    pub fn order(&self, epoch: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.dataset.len()).collect();
        if self.config.shuffle {
            indices.shuffle(&mut StdRng::seed_from_u64(self.config.seed.wrapping_add(epoch as u64)));
        }
        indices
    }

    /// Iterate one epoch of batches
    pub fn epoch(&self, epoch: usize) -> Batches {
        let dataset = Arc::clone(&self.dataset);
        let config = self.config.clone();
        let order = self.order(epoch);
        let (sender, receiver) = sync_channel(1);

        let worker = std::thread::spawn(move || {
            let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(epoch as u64) ^ 0xf11f);
            for chunk in order.chunks(config.batch_size) {
                let batch = collate(dataset.as_ref(), chunk, config.flip_input, &mut rng);
                let failed = batch.is_err();
                if sender.send(batch).is_err() || failed {
                    break;
                }
            }
        });

        Batches { receiver: Some(receiver), worker: Some(worker) }
    }
}

/// Stacked `[N, 3, H, W]` inputs and targets
type RawBatch = (ArrayD<f32>, ArrayD<f32>);

fn collate(
    dataset: &dyn PairedDataset,
    indices: &[usize],
    flip_input: f32,
    rng: &mut StdRng,
) -> Result<RawBatch> {
    let mut inputs: Vec<Array3<f32>> = Vec::with_capacity(indices.len());
    let mut targets: Vec<Array3<f32>> = Vec::with_capacity(indices.len());
    for &index in indices {
        let ImagePair { mut input, target } = dataset.get(index)?;
        if flip_input > 0.0 && rng.random::<f32>() < flip_input {
            input.invert_axis(Axis(2));
        }
        inputs.push(input);
        targets.push(target);
    }

    let stack_all = |items: &[Array3<f32>], what: &str| -> Result<ArrayD<f32>> {
        let views: Vec<_> = items.iter().map(|a| a.view()).collect();
        stack(Axis(0), &views)
            .map(|a| a.into_dyn())
            .map_err(|e| Error::InvalidParameter(format!("cannot batch {what}: {e}")))
    };
    Ok((stack_all(&inputs, "inputs")?, stack_all(&targets, "targets")?))
}

/// Iterator over one epoch's batches
pub struct Batches {
    receiver: Option<Receiver<Result<RawBatch>>>,
    worker: Option<JoinHandle<()>>,
}

impl Iterator for Batches {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        let raw = self.receiver.as_ref()?.recv().ok()?;
        Some(raw.map(|(inputs, targets)| {
            Batch::new(Tensor::constant(inputs), Tensor::constant(targets))
        }))
    }
}

impl Drop for Batches {
    fn drop(&mut self) {
        // Closing the channel first unblocks a worker waiting to send
        self.receiver.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("batch loader worker panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MemoryDataset;

    fn dataset(n: usize) -> Arc<dyn PairedDataset> {
        let pairs = (0..n)
            .map(|i| {
                let input = Array3::from_shape_fn((3, 2, 2), |(_, _, x)| i as f32 + x as f32 * 0.5);
                ImagePair { input, target: Array3::from_elem((3, 2, 2), i as f32) }
            })
            .collect();
        Arc::new(MemoryDataset::new(pairs))
    }

    #[test]
    fn test_batches_cover_dataset_once() {
        let loader = BatchLoader::new(dataset(10), LoaderConfig::default().with_batch_size(4));
        assert_eq!(loader.num_batches(), 3);

        let batches: Vec<Batch> = loader.epoch(0).collect::<Result<_>>().unwrap();
        let sizes: Vec<usize> = batches.iter().map(Batch::size).collect();
        assert_eq!(sizes, vec![4, 4, 2]);

        let mut seen: Vec<usize> = batches
            .iter()
            .flat_map(|b| b.targets.data().axis_iter(Axis(0)).map(|t| t[[0, 0, 0]] as usize).collect::<Vec<_>>())
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_shuffle_is_seeded_per_epoch() {
        let config = LoaderConfig::default().with_seed(7);
        let a = BatchLoader::new(dataset(20), config.clone());
        let b = BatchLoader::new(dataset(20), config);
        assert_eq!(a.order(3), b.order(3));
        assert_ne!(a.order(3), a.order(4));

        let sequential = BatchLoader::new(dataset(5), LoaderConfig::default().with_shuffle(false));
        assert_eq!(sequential.order(9), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_flip_mirrors_input_only() {
        let config = LoaderConfig::default().with_shuffle(false).with_batch_size(1).with_flip_input(1.0);
        let loader = BatchLoader::new(dataset(1), config);
        let batch = loader.epoch(0).next().unwrap().unwrap();
        let input = batch.inputs.data();
        assert_eq!(input[[0, 0, 0, 0]], 0.5);
        assert_eq!(input[[0, 0, 0, 1]], 0.0);
        assert!(batch.targets.data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_dropping_iterator_early_stops_worker() {
        let loader = BatchLoader::new(dataset(50), LoaderConfig::default().with_batch_size(1));
        let mut batches = loader.epoch(0);
        assert!(batches.next().is_some());
        drop(batches);
    }
}
