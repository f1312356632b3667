//! Adversarial trainer for the generator/discriminator pair
//!
//! - `step`: one discriminator update followed by the generator updates
//! - `epoch`: averaging over a batch stream, validation triptychs
//! - `train_loop`: multi-epoch `fit` with loss log and checkpoints

mod core;
mod epoch;
mod result;
mod step;
mod train_loop;

pub use core::GanTrainer;
pub use result::TrainReport;
