//! Validate command implementation

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{load_config, TrainSpec, ValidateArgs};

/// Format data configuration as a string
pub fn format_data_info(spec: &TrainSpec) -> String {
    let mut lines = vec![format!("  Training data: {}", spec.data.train.display())];
    if let Some(val) = &spec.data.val {
        lines.push(format!("  Validation data: {}", val.display()));
    }
    lines.push(format!("  Batch size: {}", spec.data.batch_size));
    lines.push(format!("  Image size: {}", spec.data.image_size));
    if spec.data.flip_input > 0.0 {
        lines.push(format!("  Input flip probability: {}", spec.data.flip_input));
    }
    lines.join("\n")
}

/// Format network and optimizer configuration as a string
pub fn format_model_info(spec: &TrainSpec) -> String {
    let gen = &spec.optimizer.generator;
    let disc = &spec.optimizer.discriminator;
    [
        format!("  Generator: {}", spec.model.generator.architecture()),
        format!("    Adam lr={} betas=({}, {})", gen.lr, gen.beta1, gen.beta2),
        format!("  Discriminator: {}", spec.model.discriminator.architecture()),
        format!("    Adam lr={} betas=({}, {})", disc.lr, disc.beta1, disc.beta2),
    ]
    .join("\n")
}

/// Format training configuration as a string
pub fn format_training_info(spec: &TrainSpec) -> String {
    let w = &spec.training.loss_weights;
    let mut lines = vec![
        format!("  Epochs: {}", spec.training.epochs),
        format!("  Generator steps per batch: {}", spec.training.generator_steps),
        format!(
            "  Loss weights: adversarial={} reconstruction={} perceptual={}",
            w.adversarial, w.reconstruction, w.perceptual
        ),
        format!("  Precision: {}", spec.precision.compute_precision),
    ];
    if spec.checkpoint.load {
        lines.push(format!(
            "  Resume from: {} / {}",
            spec.checkpoint.generator.display(),
            spec.checkpoint.discriminator.display()
        ));
    }
    lines.join("\n")
}

pub fn run_validate(args: ValidateArgs, level: LogLevel) -> Result<(), String> {
    log(
        level,
        LogLevel::Normal,
        &format!("Validating config: {}", args.config.display()),
    );

    let spec = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;

    log(level, LogLevel::Normal, "✓ Configuration is valid");

    if args.detailed {
        log(level, LogLevel::Normal, "");
        log(level, LogLevel::Normal, "Data:");
        log(level, LogLevel::Normal, &format_data_info(&spec));
        log(level, LogLevel::Normal, "Model:");
        log(level, LogLevel::Normal, &format_model_info(&spec));
        log(level, LogLevel::Normal, "Training:");
        log(level, LogLevel::Normal, &format_training_info(&spec));
    }

    Ok(())
}
