//! Training result types

use crate::train::EpochSummary;

/// Outcome of [`GanTrainer::fit`](super::GanTrainer::fit)
#[derive(Debug, Clone)]
pub struct TrainReport {
    /// First epoch run (non-zero after a resume)
    pub start_epoch: usize,
    pub epochs_run: usize,
    /// Number of completed epochs, as recorded in the last checkpoint
    pub final_epoch: usize,
    pub history: Vec<EpochSummary>,
    /// Total training time in seconds
    pub elapsed_secs: f64,
    /// (generator, discriminator) loss scales at the end of training
    pub loss_scales: (f32, f32),
}

impl TrainReport {
    pub fn last(&self) -> Option<&EpochSummary> {
        self.history.last()
    }
}
