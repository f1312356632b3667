//! Info command implementation

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{InfoArgs, OutputFormat};
use crate::io::inspect_checkpoint;

pub fn run_info(args: InfoArgs, level: LogLevel) -> Result<(), String> {
    let info = inspect_checkpoint(&args.checkpoint).map_err(|e| format!("Checkpoint error: {e}"))?;

    match args.format {
        OutputFormat::Text => {
            log(level, LogLevel::Normal, "Checkpoint Info:");
            println!();
            println!("Architecture: {}", info.architecture);
            println!("Resume epoch: {}", info.epoch);
            println!("Optimizer steps: {}", info.optimizer_step);
            println!("Learning rate: {}", info.learning_rate);
            println!("Parameters: {} in {} tensors", info.num_parameters, info.num_tensors);
            if let Some(saved_at) = &info.saved_at {
                println!("Saved: {saved_at}");
            }
            if !info.has_optimizer_state {
                println!("Optimizer state: absent");
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&info)
                .map_err(|e| format!("JSON serialization error: {e}"))?;
            println!("{json}");
        }
        OutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(&info)
                .map_err(|e| format!("YAML serialization error: {e}"))?;
            println!("{yaml}");
        }
    }

    Ok(())
}
