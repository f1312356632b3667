//! Train command implementation

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{apply_overrides, load_config, train_from_spec, validate_config, TrainArgs};

pub fn run_train(args: TrainArgs, level: LogLevel) -> Result<(), String> {
    log(
        level,
        LogLevel::Normal,
        &format!("Boceto: Training from {}", args.config.display()),
    );

    // Load and validate config
    let mut spec = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;

    // Apply command-line overrides, then re-check the result
    apply_overrides(&mut spec, &args);
    validate_config(&spec).map_err(|e| format!("Config error: {e}"))?;

    if args.dry_run {
        log(level, LogLevel::Normal, "Dry run - config validated successfully");
        log(
            level,
            LogLevel::Verbose,
            &format!("  Training data: {}", spec.data.train.display()),
        );
        log(
            level,
            LogLevel::Verbose,
            &format!(
                "  Generator: {} (lr={})",
                spec.model.generator.architecture(),
                spec.optimizer.generator.lr
            ),
        );
        log(
            level,
            LogLevel::Verbose,
            &format!(
                "  Discriminator: {} (lr={})",
                spec.model.discriminator.architecture(),
                spec.optimizer.discriminator.lr
            ),
        );
        log(level, LogLevel::Verbose, &format!("  Epochs: {}", spec.training.epochs));
        log(level, LogLevel::Verbose, &format!("  Batch size: {}", spec.data.batch_size));
        return Ok(());
    }

    let report = train_from_spec(&spec).map_err(|e| format!("Training error: {e}"))?;

    log(
        level,
        LogLevel::Normal,
        &format!(
            "Training complete: {} epochs in {:.1}s (now at epoch {})",
            report.epochs_run, report.elapsed_secs, report.final_epoch
        ),
    );
    Ok(())
}
