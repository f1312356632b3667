//! Best-of-N evaluation over a validation set

use super::registry::ModelPair;
use super::select::select_best;
use crate::autograd::{Context, Tensor};
use crate::data::PairedDataset;
use crate::error::Result;
use crate::io::save_triptych;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Mean pixel distance of the selected candidates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub images: usize,
    /// Mean absolute error in normalised [-1, 1] space
    pub mean_l1: f32,
}

/// Run best-of-N on up to `max_images` validation pairs
///
/// Each selection is written to `out_dir/{i:04}.png` as an
/// `input | selected | target` triptych.
pub fn evaluate_dataset(
    pair: &ModelPair,
    dataset: &dyn PairedDataset,
    out_dir: &Path,
    samples: usize,
    max_images: usize,
    ctx: &mut Context,
) -> Result<EvaluationReport> {
    let count = dataset.len().min(max_images);
    let mut total = 0.0f32;

    for i in 0..count {
        let example = dataset.get(i)?;
        let input = Tensor::constant(example.input.into_dyn());
        let target = Tensor::constant(example.target.into_dyn());
        let selection = select_best(&pair.generator, &pair.discriminator, &input, samples, ctx)?;

        let l1 = mean_abs_diff(&selection.tensor, &target);
        total += l1;
        save_triptych(out_dir.join(format!("{i:04}.png")), &input, &selection.tensor, &target)?;
        tracing::debug!(image = i, l1, chosen = selection.index, "evaluated");
    }

    let mean_l1 = if count == 0 { 0.0 } else { total / count as f32 };
    tracing::info!(images = count, mean_l1, "validation L1 (best per image)");
    Ok(EvaluationReport { images: count, mean_l1 })
}

fn mean_abs_diff(a: &Tensor, b: &Tensor) -> f32 {
    let diff = a.data() - b.data();
    diff.mapv(f32::abs).mean().unwrap_or(0.0)
}
