//! Paired training data
//!
//! A [`PairedDataset`] yields (input, target) arrays; a [`BatchLoader`]
//! shuffles, augments and stacks them into [`crate::train::Batch`]es.

mod dataset;
mod loader;

pub use dataset::{split_pair, FolderDataset, ImagePair, MemoryDataset, PairedDataset};
pub use loader::{BatchLoader, Batches, LoaderConfig};
