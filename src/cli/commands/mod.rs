//! CLI command implementations

mod evaluate;
mod generate;
mod info;
#[cfg(feature = "server")]
mod serve;
mod train;
mod validate;

#[cfg(test)]
mod tests;

use crate::cli::logging::init_tracing;
use crate::cli::LogLevel;
use crate::config::{Cli, Command};

/// Execute a CLI command based on the parsed arguments
pub fn run_command(cli: Cli) -> Result<(), String> {
    // Configure output based on verbose/quiet flags
    let log_level = if cli.quiet {
        LogLevel::Quiet
    } else if cli.verbose {
        LogLevel::Verbose
    } else {
        LogLevel::Normal
    };
    init_tracing(log_level);

    match cli.command {
        Command::Train(args) => train::run_train(args, log_level),
        Command::Validate(args) => validate::run_validate(args, log_level),
        Command::Generate(args) => generate::run_generate(args, log_level),
        Command::Evaluate(args) => evaluate::run_evaluate(args, log_level),
        Command::Info(args) => info::run_info(args, log_level),
        #[cfg(feature = "server")]
        Command::Serve(args) => serve::run_serve(args, log_level),
    }
}
