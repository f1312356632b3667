//! Generate command implementation

use crate::autograd::{Context, ForwardMode};
use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{CheckpointArgs, GenerateArgs};
use crate::inference::{preprocess, select_best, ModelPair, VariantPaths};

/// Load the pair named on the command line
pub(super) fn load_pair(args: &CheckpointArgs) -> Result<ModelPair, String> {
    VariantPaths::from_checkpoints(&args.generator, &args.discriminator)
        .and_then(|paths| ModelPair::load(&paths))
        .map_err(|e| format!("Checkpoint error: {e}"))
}

pub(super) fn sampling_context(seed: Option<u64>) -> Context {
    match seed {
        Some(seed) => Context::with_seed(ForwardMode::Sampling, seed),
        None => Context::new(ForwardMode::Sampling),
    }
}

pub fn run_generate(args: GenerateArgs, level: LogLevel) -> Result<(), String> {
    let pair = load_pair(&args.checkpoints)?;

    let bytes = std::fs::read(&args.input)
        .map_err(|e| format!("Failed to read {}: {e}", args.input.display()))?;
    let input = preprocess(&bytes).map_err(|e| format!("Input error: {e}"))?;

    let mut ctx = sampling_context(args.seed);
    let selection = select_best(&pair.generator, &pair.discriminator, &input, args.samples, &mut ctx)
        .map_err(|e| format!("Generation error: {e}"))?;

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| format!("Failed to create {}: {e}", parent.display()))?;
    }
    selection
        .image
        .save(&args.output)
        .map_err(|e| format!("Failed to write {}: {e}", args.output.display()))?;

    log(
        level,
        LogLevel::Normal,
        &format!(
            "Wrote {} (candidate {} of {}, score {:.4})",
            args.output.display(),
            selection.index + 1,
            args.samples,
            selection.score
        ),
    );
    log(level, LogLevel::Verbose, &format!("  Scores: {:?}", selection.scores));
    Ok(())
}
