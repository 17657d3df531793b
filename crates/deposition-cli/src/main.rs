mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod utils;

use crate::cli::{Cli, Commands};
use crate::error::{CliError, Result};
use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, error, info};

fn main() -> ExitCode {
    match run_app() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("\n❌ Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_app() -> Result<ExitCode> {
    let cli = Cli::parse();

    let log_file = cli.log_file.clone().or_else(|| {
        cli.settings_path()
            .and_then(config::file::log_file_setting)
    });
    logging::setup_logging(cli.verbose, cli.quiet, log_file.as_deref())?;

    let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default().into_hooks();
    eyre_hook.install().map_err(|e| CliError::Other(e.into()))?;
    std::panic::set_hook(Box::new(move |pi| {
        error!("{}", panic_hook.panic_report(pi));
    }));

    info!("🚀 deposit v{} starting up.", env!("CARGO_PKG_VERSION"));
    debug!("Full CLI arguments parsed: {:?}", &cli);

    let command_result = match cli.command {
        Commands::Run(args) => {
            info!("Dispatching to 'run' command.");
            commands::run::run(args)
        }
        Commands::Validate(args) => {
            info!("Dispatching to 'validate' command.");
            commands::validate::run(args).map(|()| ExitCode::SUCCESS)
        }
        Commands::Status(args) => {
            info!("Dispatching to 'status' command.");
            commands::status::run(args).map(|()| ExitCode::SUCCESS)
        }
    };

    match &command_result {
        Ok(_) => info!("✅ Command completed."),
        Err(e) => error!("❌ Command failed: {}", e),
    }

    command_result
}
