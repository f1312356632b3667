//! Evaluate command implementation

use super::generate::{load_pair, sampling_context};
use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::EvaluateArgs;
use crate::data::FolderDataset;
use crate::inference::evaluate_dataset;
use crate::model::IMAGE_SIZE;

pub fn run_evaluate(args: EvaluateArgs, level: LogLevel) -> Result<(), String> {
    let pair = load_pair(&args.checkpoints)?;
    let dataset = FolderDataset::open(&args.val_dir, IMAGE_SIZE as u32)
        .map_err(|e| format!("Dataset error: {e}"))?;

    let mut ctx = sampling_context(args.seed);
    let report = evaluate_dataset(
        &pair,
        &dataset,
        &args.output_dir,
        args.samples,
        args.max_images,
        &mut ctx,
    )
    .map_err(|e| format!("Evaluation error: {e}"))?;

    log(
        level,
        LogLevel::Normal,
        &format!(
            "Validation L1 Loss (best per image): {:.4} over {} images",
            report.mean_l1, report.images
        ),
    );
    Ok(())
}
