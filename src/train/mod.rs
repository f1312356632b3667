//! Adversarial training of the image translation pair
//!
//! This module provides:
//! - Loss functions and the weighted GAN objectives
//! - The [`GanTrainer`] alternating discriminator and generator updates
//! - Training configuration
//! - Per-epoch loss summaries
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use boceto::data::{BatchLoader, FolderDataset, LoaderConfig};
//! use boceto::train::{GanTrainer, TrainConfig};
//!
//! let train = FolderDataset::open("data/train", 256)?;
//! let loader = BatchLoader::new(Arc::new(train), LoaderConfig::default().with_batch_size(16));
//!
//! let mut trainer = GanTrainer::new(TrainConfig::default().with_epochs(50))?;
//! for summary in trainer.fit(&loader, None)?.history {
//!     println!("{summary}");
//! }
//! # Ok::<(), boceto::Error>(())
//! ```

mod batch;
mod config;
pub mod loss;
mod metrics;
mod trainer;

pub use batch::Batch;
pub use config::{AdamConfig, CheckpointConfig, TrainConfig};
pub use loss::{
    discriminator_objective, generator_objective, BCEWithLogitsLoss, GeneratorLosses, L1Loss,
    LossFn, LossWeights, PerceptualLoss, ReconstructionLoss, SoftMaskedL1Loss,
};
pub use metrics::{EpochAccumulator, EpochSummary, StepLosses};
pub use trainer::{GanTrainer, TrainReport};
